//! Connectivity probe: connect to a bridge, list the cluster, run one scan
//! or primary-key lookup end-to-end, print flat metrics.

use std::io;
use std::time::Instant;

use shrike_adapters::rest::RestBridge;
use shrike_core::browse::NamespaceBrowseState;
use shrike_core::dispatcher::QueryDispatcher;
use shrike_core::profiles::ConnectionProfile;
use shrike_core::query_spec::{parse, ParseContext, QuerySpec};
use shrike_core::session::SessionController;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeConfig {
    bridge_url: String,
    hosts: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    ns: String,
    set: String,
    pk: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://127.0.0.1:8080".to_string(),
            hosts: "127.0.0.1:3000".to_string(),
            port: 3000,
            username: None,
            password: None,
            ns: "test".to_string(),
            set: "users".to_string(),
            pk: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseOutcome {
    Config,
    HelpRequested,
}

const USAGE: &str = "\
probe [--bridge URL] [--hosts H] [--port N] [--user U] [--password P]
      [--ns NAMESPACE] [--set SET] [--pk KEY]

Runs connect -> node listing -> set listing -> one scan (or one primary-key
lookup when --pk is given) against the HTTP bridge and prints metrics.";

fn parse_args_from<I: Iterator<Item = String>>(
    args: I,
    config: &mut ProbeConfig,
) -> Result<ParseOutcome, String> {
    let mut args = args;
    while let Some(flag) = args.next() {
        if flag == "--help" || flag == "-h" {
            return Ok(ParseOutcome::HelpRequested);
        }
        let value = args
            .next()
            .ok_or_else(|| format!("missing value for {flag}"))?;
        match flag.as_str() {
            "--bridge" => config.bridge_url = value,
            "--hosts" => config.hosts = value,
            "--port" => {
                config.port = value
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port `{value}`"))?;
            }
            "--user" => config.username = Some(value),
            "--password" => config.password = Some(value),
            "--ns" => config.ns = value,
            "--set" => config.set = value,
            "--pk" => config.pk = Some(value),
            other => return Err(format!("unknown flag `{other}`")),
        }
    }
    Ok(ParseOutcome::Config)
}

fn io_other(error: impl std::fmt::Display) -> io::Error {
    io::Error::other(error.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ProbeConfig::default();
    match parse_args_from(std::env::args().skip(1), &mut config) {
        Ok(ParseOutcome::Config) => {}
        Ok(ParseOutcome::HelpRequested) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return Err(io_other(message).into());
        }
    }

    let mut profile = ConnectionProfile::new("probe", config.hosts.clone());
    profile.port = config.port;
    profile.username = config.username.clone();
    profile.password = config.password.clone();

    let bridge = RestBridge::new(config.bridge_url.clone());
    let mut controller = SessionController::new(bridge.clone());
    let connect_latency = controller.connect(profile, None).await.map_err(io_other)?;
    println!(
        "metric.connect_ms={:.3}",
        connect_latency.as_secs_f64() * 1_000.0
    );

    let session = controller.session().ok_or_else(|| io_other("no session"))?;
    println!("metric.nodes={}", session.nodes.len());
    println!("metric.namespaces={}", session.namespaces().len());
    let host = session.host.clone();

    let browse = NamespaceBrowseState::enter(&bridge, &host, config.ns.clone(), None)
        .await
        .map_err(io_other)?;
    println!("metric.sets={}", browse.sets().len());

    let spec = match &config.pk {
        Some(pk) => {
            let document = format!(r#"{{"$pk": [{}]}}"#, serde_json::Value::String(pk.clone()));
            parse(&document, &ParseContext::default()).map_err(io_other)?
        }
        None => QuerySpec::Scan,
    };

    let mut dispatcher = QueryDispatcher::new(bridge);
    let context = browse
        .snapshot()
        .map(|snapshot| shrike_core::browse::BrowseContext {
            set: config.set.clone(),
            ..snapshot
        })
        .unwrap_or_else(|| shrike_core::browse::BrowseContext {
            ns: config.ns.clone(),
            set: config.set.clone(),
            set_index: 0,
        });
    let ticket = dispatcher.begin(context).map_err(io_other)?;

    let started_at = Instant::now();
    let rows = match dispatcher.execute(&spec, &ticket).await {
        Ok(rows) => rows,
        Err(error) => {
            dispatcher.fail(&ticket);
            return Err(io_other(error).into());
        }
    };
    let elapsed = started_at.elapsed();

    let results = dispatcher
        .complete(ticket, rows)
        .ok_or_else(|| io_other("probe context went stale"))?;
    println!("metric.query_kind={}", spec.kind());
    println!("metric.rows={}", results.len());
    println!("metric.query_ms={:.3}", elapsed.as_secs_f64() * 1_000.0);
    println!("metric.headers={}", results.header_keys.join(","));

    controller.disconnect().await.map_err(io_other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_args_from, ParseOutcome, ProbeConfig};

    fn parse(args: &[&str]) -> Result<(ProbeConfig, ParseOutcome), String> {
        let mut config = ProbeConfig::default();
        let outcome = parse_args_from(args.iter().map(|arg| (*arg).to_string()), &mut config)?;
        Ok((config, outcome))
    }

    #[test]
    fn defaults_survive_an_empty_command_line() {
        let (config, outcome) = parse(&[]).expect("parse should succeed");
        assert_eq!(outcome, ParseOutcome::Config);
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn flags_override_the_defaults() {
        let (config, _) = parse(&[
            "--bridge",
            "http://bridge:9000",
            "--hosts",
            "10.0.0.1:3000",
            "--port",
            "3200",
            "--ns",
            "bar",
            "--set",
            "audit",
            "--pk",
            "a-1",
        ])
        .expect("parse should succeed");

        assert_eq!(config.bridge_url, "http://bridge:9000");
        assert_eq!(config.port, 3200);
        assert_eq!(config.ns, "bar");
        assert_eq!(config.pk.as_deref(), Some("a-1"));
    }

    #[test]
    fn unknown_flags_and_missing_values_are_rejected() {
        assert!(parse(&["--nope", "x"]).is_err());
        assert!(parse(&["--port"]).is_err());
        assert!(parse(&["--port", "not-a-number"]).is_err());
    }

    #[test]
    fn help_short_circuits() {
        let (_, outcome) = parse(&["--help"]).expect("parse should succeed");
        assert_eq!(outcome, ParseOutcome::HelpRequested);
    }
}
