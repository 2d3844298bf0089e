//! `kai doctor`: Diagnose configuration and upstream reachability.

use std::path::Path;

use kai_config::CredentialSource;
use kai_core::provider::ProviderFactory;
use kai_providers::OpenAiCompatFactory;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Kai Doctor: System Diagnostics");
    println!("===============================\n");

    let mut issues = 0;

    let path = super::config_path(config_path);
    if path.exists() {
        println!("  ✅ Config file: {}", path.display());
    } else {
        println!("  ℹ️  No config file at {}, using defaults", path.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Err(format!("Config invalid: {e}").into());
        }
    };

    let credentials = config.credential_source();
    match credentials.api_key() {
        Some(key) => {
            println!("  ✅ API key found ({})", credentials.describe());

            let factory = OpenAiCompatFactory::from_config(&config.provider)?;
            let provider = factory.build(&key);
            match provider.health_check().await {
                Ok(true) => println!("  ✅ Upstream reachable: {}", config.provider.api_url),
                Ok(false) => {
                    println!("  ⚠️  Upstream responded with an error: {}", config.provider.api_url);
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Upstream unreachable: {e}");
                    issues += 1;
                }
            }
        }
        None => {
            println!("  ❌ No API key ({})", credentials.describe());
            issues += 1;
        }
    }

    println!("  ℹ️  Model: {}", config.provider.model);

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(())
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        Err(format!("doctor found {issues} issue(s)").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn invalid_config_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\ntemperature = 5.0").unwrap();

        let err = run(Some(file.path())).await.unwrap_err();
        assert!(err.to_string().contains("Config invalid"));
    }

    #[tokio::test]
    async fn unparsable_config_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml = [").unwrap();

        assert!(run(Some(file.path())).await.is_err());
    }
}
