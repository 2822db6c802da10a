use kivy_boot_lib::{BootConfig, Bootstrap, CanvasTarget, ScriptSource};

const DEMO_CONNECTOR: &str = r#"
import connector

def draw_frame(title):
    width, height = connector.canvas_size()
    connector.clear()
    connector.fill_rect(0, 0, width, height, connector.color_css('black'))
    connector.fill_rect(0, 0, width, connector.dp(56), connector.color_css('primary'))
    connector.fill_text(title, connector.dp(16), connector.dp(36), '24px sans-serif', connector.color_css('white'))
"#;

const DEMO_APP: &str = r#"
import connector

draw_frame('kivy-boot demo')
connector.line(0, 56, canvas_width, 56, 2, connector.color_css('accent'))
"#;

fn main() {
    let mut config = BootConfig::default();

    match std::env::args().nth(1) {
        Some(base) => {
            config.base_url = Some(url::Url::parse(&base).expect("base URL must parse"));
        }
        None => {
            config.connector = ScriptSource::Inline {
                name: "connector.py".to_string(),
                text: DEMO_CONNECTOR.to_string(),
            };
            config.app = ScriptSource::Inline {
                name: "kivy_app.py".to_string(),
                text: DEMO_APP.to_string(),
            };
        }
    }

    let future = Bootstrap {
        config,
        canvas: CanvasTarget::Headless {
            width: 1280,
            height: 720,
        },
    }
    .run();

    pollster::block_on(future);

    let ops = kivy_boot_lib::take_ops();
    if !ops.is_empty() {
        log::info!("Recorded {} draw calls", ops.len());
    }
}
