use std::{env, env::VarError};

/// There's no real CLI for the worker, so any argument just prints the help and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "SE_DATABASE_URL",
        "SE_DB_MAX_CONNECTIONS",
        "SE_RUN_MIGRATIONS",
        "SE_UNPAID_ORDER_TIMEOUT",
        "SE_EXPIRY_INTERVAL",
        "SE_DEFAULT_SHIPPING_UGX",
        "SE_DEFAULT_SHIPPING_CREDITS",
        "SE_MAX_CREDIT_PERCENTAGE",
        "SE_CREDIT_CONVERSION_RATE",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
