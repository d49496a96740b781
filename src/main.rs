//! whois-probe - WHOIS lookups from the command line
//!
//! Every command prints a JSON response envelope on stdout; logs go to
//! stderr and are filtered through `RUST_LOG`.

use std::env;
use std::io::{self, BufRead};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use whois_probe::{
    api::{status_code, HealthReport},
    ApiResponse, LookupConfig, Result, TldRegistry, WhoisLookup, WhoisService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the library
    if let Err(e) = whois_probe::init() {
        eprintln!("Failed to initialize: {}", e);
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_help();
        process::exit(2);
    };
    if command == "--help" || command == "-h" || command == "help" {
        print_help();
        return Ok(());
    }

    let config = match LookupConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&ApiResponse::failure(&e), 1),
    };

    let registry = Arc::new(TldRegistry::bundled());
    registry.initialize().await;
    let service = WhoisService::with_config(registry, config);

    let response = match run_command(&service, command, &args[1..]).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(command = %command, error = %e, "Command failed");
            let code = if status_code(e.kind()) == 400 { 2 } else { 1 };
            exit_with(&ApiResponse::failure(&e), code)
        }
    };

    println!("{}", response.to_json());
    Ok(())
}

async fn run_command(service: &WhoisService, command: &str, rest: &[String]) -> Result<ApiResponse> {
    match command {
        "tlds" => Ok(ApiResponse::tlds(service.get_available_tlds().await)),
        "lookup" => {
            let domain = single_argument(command, rest)?;
            Ok(ApiResponse::record(service.get_whois_data(domain, None).await?))
        }
        "raw" => {
            let query = rest.first().map(String::as_str).unwrap_or_default();
            Ok(ApiResponse::raw(service.get_raw_whois_data(query, None).await?))
        }
        "mass" => {
            let domains = if rest.is_empty() || rest[0] == "-" {
                read_stdin_domains()
            } else {
                rest.to_vec()
            };
            Ok(ApiResponse::batch(service.mass_whois_lookup(&domains, None).await?))
        }
        "health" => Ok(ApiResponse::health(HealthReport::collect(service).await)),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            process::exit(2);
        }
    }
}

fn single_argument<'a>(command: &str, rest: &'a [String]) -> Result<&'a str> {
    match rest {
        [one] => Ok(one.as_str()),
        _ => Err(whois_probe::WhoisError::invalid_domain(
            rest.join(" "),
            format!("'{}' takes exactly one domain", command),
        )),
    }
}

/// One domain per line (or per whitespace-separated token)
fn read_stdin_domains() -> Vec<String> {
    io::stdin()
        .lock()
        .lines()
        .map_while(|line| line.ok())
        .flat_map(|line| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn exit_with(response: &ApiResponse, code: i32) -> ! {
    println!("{}", response.to_json());
    process::exit(code);
}

fn print_help() {
    println!("whois-probe - WHOIS lookups for domains and URLs");
    println!();
    println!("USAGE:");
    println!("    whois-probe <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    tlds                      List queryable top-level zones");
    println!("    lookup <DOMAIN|URL>       Parsed WHOIS record of the root domain");
    println!("    raw <QUERY>               Unparsed reply, query sent as given");
    println!("    mass [DOMAIN...]          Concurrent lookup (reads stdin when no domains given)");
    println!("    health                    Registry and lookup counters");
    println!();
    println!("EXAMPLES:");
    println!("    whois-probe lookup https://www.example.com/about");
    println!("    whois-probe raw com");
    println!("    cat domains.txt | whois-probe mass");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    WHOIS_QUERY_TIMEOUT_MS    Per-query budget (default: 15000)");
    println!("    WHOIS_MASS_DEADLINE_MS    Mass lookup deadline (default: 30000)");
    println!("    WHOIS_JITTER_MIN_MS       Minimum pacing delay (default: 10)");
    println!("    WHOIS_JITTER_MAX_MS       Maximum pacing delay (default: 100)");
    println!("    WHOIS_MAX_IN_FLIGHT       Concurrent queries (default: 16)");
    println!("    WHOIS_MAX_BATCH           Domains per mass lookup (default: 150)");
    println!("    WHOIS_PORT                WHOIS port (default: 43)");
    println!("    WHOIS_FOLLOW_REFERRAL     Follow registrar referrals (default: true)");
    println!("    RUST_LOG                  Log filter (default: info)");
}
