use url::Url;

use crate::error::BootError;

/// Where a script's source text comes from.
#[derive(Debug, Clone)]
pub enum ScriptSource {
    /// A path resolved against the configured base URL and fetched with an
    /// HTTP GET. The payload is read once; nothing is cached or verified.
    Remote(String),
    /// Source text supplied directly, no fetch involved.
    Inline { name: String, text: String },
}

/// A script ready to execute; `name` attributes execution errors.
#[derive(Debug, Clone)]
pub struct LoadedScript {
    pub name: String,
    pub text: String,
}

impl ScriptSource {
    pub async fn load(&self, base: Option<&Url>) -> Result<LoadedScript, BootError> {
        match self {
            ScriptSource::Remote(path) => {
                let url = resolve(base, path)?;

                let request = ehttp::Request::get(url.as_str());
                let response =
                    ehttp::fetch_async(request)
                        .await
                        .map_err(|reason| BootError::Fetch {
                            url: url.to_string(),
                            reason,
                        })?;

                if !response.ok {
                    return Err(BootError::Fetch {
                        url: url.to_string(),
                        reason: format!("HTTP {} {}", response.status, response.status_text),
                    });
                }

                let text = response.text().ok_or_else(|| BootError::Fetch {
                    url: url.to_string(),
                    reason: "response body is not text".to_string(),
                })?;

                Ok(LoadedScript {
                    name: path.clone(),
                    text: text.to_string(),
                })
            }
            ScriptSource::Inline { name, text } => Ok(LoadedScript {
                name: name.clone(),
                text: text.clone(),
            }),
        }
    }
}

fn resolve(base: Option<&Url>, path: &str) -> Result<Url, BootError> {
    let base = base.ok_or_else(|| BootError::Fetch {
        url: path.to_string(),
        reason: "no base URL to resolve against".to_string(),
    })?;

    base.join(path).map_err(|err| BootError::Fetch {
        url: path.to_string(),
        reason: err.to_string(),
    })
}
