use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

/// Accepts `entityID=https://idp.example/slo` pairs for the IDP registry.
pub fn validator_idp_entry() -> ValueParser {
    ValueParser::from(
        move |entry: &str| -> std::result::Result<(String, String), String> {
            let (entity_id, slo_url) = entry
                .split_once('=')
                .ok_or_else(|| "expected entityID=logout-url".to_string())?;
            let entity_id = entity_id.trim();
            let slo_url = slo_url.trim();
            if entity_id.is_empty() || slo_url.is_empty() {
                return Err("expected entityID=logout-url".to_string());
            }
            Ok((entity_id.to_string(), slo_url.to_string()))
        },
    )
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("spid-session")
        .about("SPID Service Provider session controller")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SPID_SESSION_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("redis-url")
                .short('r')
                .long("redis-url")
                .help("Session store connection URL, example: redis://localhost:6379")
                .env("SPID_SESSION_REDIS_URL")
                .required(true),
        )
        .arg(
            Arg::new("public-url")
                .long("public-url")
                .help("Public base URL of this Service Provider, example: https://sp.example")
                .env("SPID_SESSION_PUBLIC_URL")
                .required(true),
        )
        .arg(
            Arg::new("entity-id")
                .long("entity-id")
                .help("SAML entity id of this Service Provider (default: the public URL)")
                .env("SPID_SESSION_ENTITY_ID"),
        )
        .arg(
            Arg::new("profile-url")
                .long("profile-url")
                .help("Client profile URL that receives the session token after login")
                .env("SPID_SESSION_PROFILE_URL")
                .required(true),
        )
        .arg(
            Arg::new("saml-cert")
                .long("saml-cert")
                .help("Path to the PEM certificate embedded in the SP metadata")
                .env("SPID_SESSION_SAML_CERT")
                .required(true),
        )
        .arg(
            Arg::new("idp")
                .long("idp")
                .help("Identity provider entry, entityID=logout-url (repeatable)")
                .env("SPID_SESSION_IDP")
                .action(clap::ArgAction::Append)
                .required(true)
                .value_parser(validator_idp_entry()),
        )
        .arg(
            Arg::new("logout-timeout")
                .long("logout-timeout")
                .help("Seconds to wait for the identity provider logout callback")
                .default_value("10")
                .env("SPID_SESSION_LOGOUT_TIMEOUT")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("tagged-errors")
                .long("tagged-errors")
                .help("Expose distinct status codes per failure kind instead of the legacy uniform 500")
                .env("SPID_SESSION_TAGGED_ERRORS")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("SPID_SESSION_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
