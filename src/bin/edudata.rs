use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use edudata_rs::{
    Client, ClientConfig, EndpointDescriptor, FilterValue, Scalar, SummaryDescriptor, Table,
    storage,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "edudata",
    version,
    about = "Fetch data from the Urban Institute Education Data Portal API"
)]
struct Cli {
    #[command(flatten)]
    conn: ConnArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch records from a data endpoint (and optionally save them).
    Get(GetArgs),
    /// Fetch server-side summary statistics.
    Summary(SummaryArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct ConnArgs {
    /// API base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,
    /// Attempts per request before giving up.
    #[arg(long, global = true, default_value_t = 3)]
    retries: u32,
}

#[derive(Args, Debug)]
struct EndpointArgs {
    /// Data level: schools, school-districts or college-university
    level: String,
    /// Data source (e.g., ccd, ipeds, crdc)
    source: String,
    /// Topic (e.g., enrollment, directory)
    topic: String,
    /// Subtopic segments separated by comma (e.g., race,sex or grade-9)
    #[arg(long)]
    subtopic: Option<String>,
    /// Filter as key=value; several values separated by comma (e.g., grade=9,10). Repeatable.
    #[arg(short, long = "filter")]
    filters: Vec<String>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Save results to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(Args, Debug)]
struct GetArgs {
    #[command(flatten)]
    endpoint: EndpointArgs,
    /// Download the full CSV file and filter locally instead of paging through JSON.
    #[arg(long, default_value_t = false)]
    csv: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[command(flatten)]
    endpoint: EndpointArgs,
    /// Statistic: sum, avg, median, max, min, count, stddev, variance
    #[arg(long)]
    stat: String,
    /// Variable to aggregate
    #[arg(long)]
    var: String,
    /// Grouping variables separated by comma
    #[arg(long)]
    by: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_scalar(s: &str) -> Scalar {
    match s.parse::<i64>() {
        Ok(i) if i.to_string() == s => Scalar::Int(i),
        _ => Scalar::Str(s.to_string()),
    }
}

fn parse_filter(s: &str) -> Result<(String, FilterValue)> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid --filter '{}', expected key=value", s))?;
    let mut values: Vec<Scalar> = parse_list(v).iter().map(|x| parse_scalar(x)).collect();
    let value = match values.len() {
        0 => FilterValue::Null,
        1 => FilterValue::One(values.remove(0)),
        _ => FilterValue::Many(values),
    };
    Ok((k.trim().to_string(), value))
}

fn parse_filters(raw: &[String]) -> Result<Vec<(String, FilterValue)>> {
    raw.iter().map(|f| parse_filter(f)).collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let client = Client::new(config_from(&cli.conn)).context("create client")?;
    let out = match cli.cmd {
        Command::Get(args) => cmd_get(&client, args),
        Command::Summary(args) => cmd_summary(&client, args),
    };
    client.close();
    out
}

fn config_from(conn: &ConnArgs) -> ClientConfig {
    let mut cfg = ClientConfig {
        timeout: Duration::from_secs(conn.timeout),
        max_retries: conn.retries,
        ..ClientConfig::default()
    };
    if let Some(base) = &conn.base_url {
        cfg.base_url = base.clone();
    }
    cfg
}

fn cmd_get(client: &Client, args: GetArgs) -> Result<()> {
    let e = &args.endpoint;
    let d = EndpointDescriptor::builder(&e.level, &e.source, &e.topic)
        .subtopic(e.subtopic.as_deref().map(parse_list).unwrap_or_default())
        .filters(parse_filters(&e.filters)?)
        .build()?;

    let table = if args.csv {
        client.fetch_csv(&d)
    } else {
        client.fetch(&d)
    }
    .with_context(|| format!("fetch {}/{}/{}", d.level(), d.source(), d.topic()))?;

    write_output(&table, &args.output)
}

fn cmd_summary(client: &Client, args: SummaryArgs) -> Result<()> {
    let e = &args.endpoint;
    let mut b = SummaryDescriptor::builder(&e.level, &e.source, &e.topic, &args.stat, &args.var)
        .subtopic(e.subtopic.as_deref().map(parse_list).unwrap_or_default())
        .by(args.by.as_deref().map(parse_list).unwrap_or_default());
    for (k, v) in parse_filters(&e.filters)? {
        b = b.filter(k, v);
    }
    let s = b.build()?;

    let table = client
        .fetch_summary(&s)
        .with_context(|| format!("fetch summary {} of {}", s.stat(), s.var()))?;

    write_output(&table, &args.output)
}

fn write_output(table: &Table, args: &OutputArgs) -> Result<()> {
    let Some(path) = args.out.as_ref() else {
        storage::write_csv(table, std::io::stdout().lock())?;
        eprintln!("{} rows", table.len());
        return Ok(());
    };

    let fmt = match args.format {
        Some(OutFormat::Csv) => "csv",
        Some(OutFormat::Json) => "json",
        None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
    }
    .to_ascii_lowercase();
    match fmt.as_str() {
        "csv" => storage::save_csv(table, path)?,
        "json" => storage::save_json(table, path)?,
        other => anyhow::bail!("unsupported format: {}", other),
    }
    eprintln!("Saved {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse_ints_lists_and_strings() {
        let (k, v) = parse_filter("grade=9,10").unwrap();
        assert_eq!(k, "grade");
        assert_eq!(v, FilterValue::Many(vec![Scalar::Int(9), Scalar::Int(10)]));

        let (_, v) = parse_filter("ncessch=010000100277").unwrap();
        assert_eq!(v, FilterValue::One(Scalar::Str("010000100277".into())));

        let (_, v) = parse_filter("fips=").unwrap();
        assert_eq!(v, FilterValue::Null);

        assert!(parse_filter("year").is_err());
    }
}
