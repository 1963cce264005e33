#![deny(warnings)]

//! Headless CLI for AgroProfit: register users, run profit simulations
//! against a JSON store file, and inspect simulation history.

use agro_core::{AreaUnit, CropCode, SimulationInput};
use agro_store::{AgroDb, JsonFileStore};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Points awarded per completed simulation. Host policy, not part of
/// the progression rules.
const POINTS_PER_SIMULATION: i64 = 20;

#[derive(Debug, Default)]
struct Args {
    store: Option<String>,
    register: Option<String>,
    email: Option<String>,
    user: Option<String>,
    crop: Option<String>,
    area: Option<Decimal>,
    unit: Option<String>,
    seed_cost: Option<Decimal>,
    fertilizer_cost: Option<Decimal>,
    labor_cost: Option<Decimal>,
    harvest: Option<Decimal>,
    price: Option<Decimal>,
    input: Option<String>,
    history: bool,
    version: bool,
}

fn parse_decimal(name: &str, value: Option<String>) -> Result<Option<Decimal>> {
    match value {
        Some(s) => Ok(Some(
            s.parse::<Decimal>()
                .with_context(|| format!("invalid number for {name}: {s}"))?,
        )),
        None => bail!("missing value for {name}"),
    }
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--store" => args.store = it.next(),
            "--register" => args.register = it.next(),
            "--email" => args.email = it.next(),
            "--user" => args.user = it.next(),
            "--crop" => args.crop = it.next(),
            "--area" => args.area = parse_decimal("--area", it.next())?,
            "--unit" => args.unit = it.next(),
            "--seed-cost" => args.seed_cost = parse_decimal("--seed-cost", it.next())?,
            "--fertilizer-cost" => {
                args.fertilizer_cost = parse_decimal("--fertilizer-cost", it.next())?
            }
            "--labor-cost" => args.labor_cost = parse_decimal("--labor-cost", it.next())?,
            "--harvest" => args.harvest = parse_decimal("--harvest", it.next())?,
            "--price" => args.price = parse_decimal("--price", it.next())?,
            "--input" => args.input = it.next(),
            "--history" => args.history = true,
            "--version" => args.version = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn parse_unit(s: &str) -> Result<AreaUnit> {
    match s {
        "hectare" | "ha" => Ok(AreaUnit::Hectare),
        "meter" | "m2" | "square_meter" => Ok(AreaUnit::SquareMeter),
        other => bail!("unknown area unit: {other} (expected hectare or meter)"),
    }
}

/// Group digits in threes with dots, id-ID style: 6500000 -> "6.500.000".
fn format_amount(v: Decimal) -> String {
    let s = v.abs().trunc().to_string();
    let mut grouped = String::new();
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if v.is_sign_negative() {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

fn build_input(args: &Args) -> Result<SimulationInput> {
    if let Some(path) = &args.input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read input file {path}"))?;
        return serde_yaml::from_str(&text).with_context(|| format!("invalid input file {path}"));
    }

    let crop = args
        .crop
        .as_deref()
        .map(CropCode::new)
        .context("--crop is required")?;
    let area = args.area.context("--area is required")?;
    let unit = match &args.unit {
        Some(u) => parse_unit(u)?,
        None => AreaUnit::Hectare,
    };

    // Flags override the crop profile defaults field by field.
    let mut input = agro_econ::input_from_profile(&crop, area, unit);
    if let Some(v) = args.seed_cost {
        input.seed_cost = v;
    }
    if let Some(v) = args.fertilizer_cost {
        input.fertilizer_cost = v;
    }
    if let Some(v) = args.labor_cost {
        input.labor_cost = v;
    }
    if let Some(v) = args.harvest {
        input.estimated_harvest = v;
    }
    if let Some(v) = args.price {
        input.price_per_kg = v;
    }
    Ok(input)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    if args.version {
        println!(
            "agro-cli {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }

    let store_path = args.store.clone().unwrap_or_else(|| "./agro.json".to_string());
    let mut db = AgroDb::new(JsonFileStore::open(&store_path)?);
    info!(store = %store_path, "store opened");

    if let Some(name) = &args.register {
        let email = args.email.as_deref().context("--email is required with --register")?;
        let user = db.create_user(name, email, Utc::now())?;
        println!("Registered {} <{}> as {}", user.name, user.email, user.id);
        return Ok(());
    }

    let email = args.user.as_deref().context("--user EMAIL is required")?;
    let user = db.user_by_email(email)?;

    if args.history {
        let sims = db.simulations_by_user(&user.id)?;
        println!("{} simulations for {}", sims.len(), user.email);
        for sim in sims {
            println!(
                "{} | {} | {} | cost {} | revenue {} | profit {} | ROI {}%",
                sim.created_at.format("%Y-%m-%d %H:%M"),
                sim.id,
                sim.result.crop_name,
                format_amount(sim.result.total_cost),
                format_amount(sim.result.total_revenue),
                format_amount(sim.result.profit),
                sim.result.roi
            );
        }
        return Ok(());
    }

    let input = build_input(&args)?;
    let (record, transition) =
        db.submit_simulation(&user.id, &input, POINTS_PER_SIMULATION, Utc::now())?;

    let r = &record.result;
    println!("Simulation {} | {}", record.id, r.crop_name);
    println!("  Total cost    : {}", format_amount(r.total_cost));
    println!("  Total revenue : {}", format_amount(r.total_revenue));
    println!("  Profit        : {}", format_amount(r.profit));
    println!("  ROI           : {}%", r.roi);

    let p = &transition.progression;
    println!(
        "Progression: {} points | level {} | {} simulations",
        p.points,
        p.level(),
        p.simulations_count
    );
    if let Some((from, to)) = transition.level_up {
        println!("Level up! {from} -> {to}");
    }
    for badge in &transition.awarded {
        println!("Badge earned: {} {} - {}", badge.icon, badge.name, badge.description);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_group_in_threes() {
        assert_eq!(format_amount(Decimal::new(6_500_000, 0)), "Rp 6.500.000");
        assert_eq!(format_amount(Decimal::new(500, 0)), "Rp 500");
        assert_eq!(format_amount(Decimal::new(-3_500_000, 0)), "-Rp 3.500.000");
        assert_eq!(format_amount(Decimal::ZERO), "Rp 0");
    }

    #[test]
    fn unit_names_parse() {
        assert_eq!(parse_unit("hectare").unwrap(), AreaUnit::Hectare);
        assert_eq!(parse_unit("m2").unwrap(), AreaUnit::SquareMeter);
        assert!(parse_unit("acre").is_err());
    }

    #[test]
    fn yaml_input_round_trips() {
        let input =
            agro_econ::input_from_profile(&CropCode::new("padi"), Decimal::ONE, AreaUnit::Hectare);
        let text = serde_yaml::to_string(&input).unwrap();
        let back: SimulationInput = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, input);
    }
}
