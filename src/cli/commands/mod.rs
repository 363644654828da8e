use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};


pub const ENV_LOG_LEVEL: &str = "SKILLSYNC_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SKILLSYNC_LOG_FORMAT";
pub const ENV_EMAIL: &str = "SKILLSYNC_EMAIL";
pub const ENV_PASSWORD: &str = "SKILLSYNC_PASSWORD";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
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

fn validator_timeout() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<u64, String> {
        crate::config::parse_timeout(value)
            .map(|timeout| timeout.as_secs())
            .map_err(|err| err.to_string())
    })
}

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email")
        .env(ENV_EMAIL)
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env(ENV_PASSWORD)
        .hide_env_values(true)
        .required(true)
}

fn path_arg() -> Arg {
    Arg::new("path")
        .help("Dashboard or API path, example: /admin/users")
        .required(true)
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("skillsync")
        .about("Skill Sync session client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .short('u')
                .long("api-url")
                .help("Platform API base URL, overrides SKILLSYNC_API_BASE_URL (default: http://localhost:8080)")
                .global(true),
        )
        .arg(
            Arg::new("store")
                .short('s')
                .long("store")
                .help("Directory holding the stored session, overrides SKILLSYNC_STORE (default: $HOME/.skillsync)")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Request timeout in seconds, overrides SKILLSYNC_TIMEOUT_SECS (default: 10)")
                .global(true)
                .value_parser(validator_timeout()),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .help("Log output format")
                .default_value("text")
                .env(ENV_LOG_FORMAT)
                .global(true)
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env(ENV_LOG_LEVEL)
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(Command::new("status").about("Show the stored session and the views it can open"))
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(email_arg())
                .arg(password_arg())
                .arg(
                    Arg::new("code")
                        .short('c')
                        .long("code")
                        .help("Second-factor code, prompted for when required and omitted"),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account and sign in")
                .arg(email_arg())
                .arg(password_arg()),
        )
        .subcommand(Command::new("logout").about("Sign out and forget the stored session"))
        .subcommand(
            Command::new("check")
                .about("Evaluate the route guard for a dashboard path")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Authenticated GET against the platform API, printing the JSON body")
                .arg(path_arg()),
        )
}
