use std::path::Path;

use eyre::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

/// Reads YAML, or TOML when the file has a `.toml` extension.
pub async fn read_deserialize<T>(path: impl AsRef<Path>) -> eyre::Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Reading from {}", path.display()))?;

    let value = if is_toml(path) {
        toml::from_str(&content).with_context(|| {
            format!("Parsing {} content was {content}", path.display())
        })?
    } else {
        serde_yaml::from_str(&content).with_context(|| {
            format!("Parsing {} content was {content}", path.display())
        })?
    };

    Ok(value)
}

pub async fn write_serialize<T>(
    path: impl AsRef<Path>,
    value: T,
) -> eyre::Result<()>
where
    T: Serialize,
{
    let path = path.as_ref();

    let content = if is_toml(path) {
        toml::to_string_pretty(&value)
            .with_context(|| format!("Serializing {}", path.display()))?
    } else {
        serde_yaml::to_string(&value)
            .with_context(|| format!("Serializing {}", path.display()))?
    };

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Writing to {}", path.display()))?;

    Ok(())
}
