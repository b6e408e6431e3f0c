use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    let public_url = required("public-url")?;

    let profile_url = required("profile-url")?;
    let profile_url =
        Url::parse(&profile_url).with_context(|| format!("Invalid profile URL: {profile_url}"))?;

    let cert_path = required("saml-cert")?;
    let saml_cert = std::fs::read_to_string(&cert_path)
        .with_context(|| format!("Failed to read certificate: {cert_path}"))?;

    let idp_registry: HashMap<String, String> = matches
        .get_many::<(String, String)>("idp")
        .map(|entries| entries.cloned().collect())
        .unwrap_or_default();

    let logout_timeout = matches
        .get_one::<u64>("logout-timeout")
        .copied()
        .unwrap_or(10);

    let mut config = AuthConfig::new(public_url, profile_url, saml_cert)
        .with_idp_registry(idp_registry)
        .with_idp_logout_timeout(Duration::from_secs(logout_timeout))
        .with_tagged_errors(matches.get_flag("tagged-errors"));

    if let Some(entity_id) = matches.get_one::<String>("entity-id") {
        config = config.with_entity_id(entity_id.clone());
    }

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        redis_url: required("redis-url")?,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use std::io::Write;

    #[test]
    fn handler_builds_the_server_action() -> Result<()> {
        let mut cert = tempfile_pem()?;
        cert.flush()?;
        let cert_path = cert.path_string();

        let matches = commands::new().get_matches_from(vec![
            "spid-session",
            "--redis-url",
            "redis://localhost:6379",
            "--public-url",
            "https://sp.example",
            "--profile-url",
            "https://app.example/profile",
            "--saml-cert",
            &cert_path,
            "--idp",
            "idp1.example=https://idp1.example/slo",
            "--logout-timeout",
            "3",
        ]);

        let action = handler(&matches)?;
        let Action::Server {
            port,
            redis_url,
            config,
        } = action;
        assert_eq!(port, 8080);
        assert_eq!(redis_url, "redis://localhost:6379");
        assert_eq!(config.entity_id(), "https://sp.example");
        assert_eq!(config.idp_logout_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.idp_registry().get("idp1.example").map(String::as_str),
            Some("https://idp1.example/slo")
        );
        Ok(())
    }

    #[test]
    fn handler_rejects_an_unreadable_certificate() {
        let matches = commands::new().get_matches_from(vec![
            "spid-session",
            "--redis-url",
            "redis://localhost:6379",
            "--public-url",
            "https://sp.example",
            "--profile-url",
            "https://app.example/profile",
            "--saml-cert",
            "/nonexistent/sp.pem",
            "--idp",
            "idp1.example=https://idp1.example/slo",
        ]);

        let result = handler(&matches);
        assert!(result.is_err());
    }

    struct TempPem {
        path: std::path::PathBuf,
        file: std::fs::File,
    }

    impl TempPem {
        fn path_string(&self) -> String {
            self.path.to_string_lossy().into_owned()
        }
    }

    impl Write for TempPem {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.file.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.file.flush()
        }
    }

    impl Drop for TempPem {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn tempfile_pem() -> Result<TempPem> {
        let path = std::env::temp_dir().join(format!(
            "spid-session-test-{}.pem",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path)?;
        file.write_all(
            b"-----BEGIN CERTIFICATE-----\nY2VydGlmaWNhdGUgcGF5bG9hZA==\n-----END CERTIFICATE-----\n",
        )?;
        Ok(TempPem { path, file })
    }
}
