use clap::{CommandFactory, Parser};
use log::{debug, warn};
use schedule_cli::cli::{Cli, Command, CustomerCommand, TagCommand, collect_overrides};
use schedule_core::config::{self, Config, Palette};
use schedule_core::customer_api::{self, NewCustomer};
use schedule_core::error::AppError;
use schedule_core::model::{Customer, ParsedSchedule, Schedule, ScheduleStatus};
use schedule_core::schedule_api::{self, NewSchedule, ScheduleFilter};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::collections::HashMap;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};

const EMPTY_CELL: &str = "-";

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

#[derive(Tabled)]
struct CustomerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Industry")]
    industry: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn load_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error {
        warn!("using default configuration: {err}");
    }
    let overrides = collect_overrides(raw_overrides).map_err(AppError::invalid_input)?;
    Ok(config::merge_overrides(&loaded.config, &overrides))
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or(EMPTY_CELL).to_string()
}

fn customer_names(customers: &[Customer]) -> HashMap<&str, &str> {
    customers
        .iter()
        .map(|customer| (customer.id.as_str(), customer.name.as_str()))
        .collect()
}

fn print_schedules_table(schedules: &[Schedule], customers: &[Customer]) {
    if schedules.is_empty() {
        println!("No follow-ups scheduled.");
        return;
    }

    let names = customer_names(customers);
    let rows = schedules.iter().map(|schedule| ScheduleRow {
        id: schedule.id.clone(),
        date: schedule.date.clone(),
        time: cell(schedule.time.as_deref()),
        title: schedule.title.clone(),
        customer: cell(
            schedule
                .customer_id
                .as_deref()
                .and_then(|id| names.get(id).copied()),
        ),
        status: schedule.status.label(),
    });
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

fn print_customers_table(customers: &[Customer]) {
    if customers.is_empty() {
        println!("No customers.");
        return;
    }

    let rows = customers.iter().map(|customer| CustomerRow {
        id: customer.id.clone(),
        name: customer.name.clone(),
        company: customer.company.clone(),
        industry: customer.industry.clone(),
        tags: customer.tags.join(", "),
    });
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

fn schedule_json(schedule: &Schedule) -> serde_json::Value {
    serde_json::json!({
        "id": schedule.id,
        "customer_id": schedule.customer_id,
        "title": schedule.title,
        "date": schedule.date,
        "time": schedule.time,
        "description": schedule.description,
        "status": schedule.status,
    })
}

fn print_schedules_json(schedules: &[Schedule]) {
    let payload: Vec<serde_json::Value> = schedules.iter().map(schedule_json).collect();
    println!("{}", serde_json::Value::Array(payload));
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn describe_when(date: &str, time: Option<&str>) -> String {
    match time {
        Some(time) => format!("{date} {time}"),
        None => date.to_string(),
    }
}

fn print_parsed(parsed: &ParsedSchedule, palette: &Palette) {
    println!("Title:    {}", palette.accentize(&parsed.title));
    println!("Date:     {}", parsed.date);
    println!(
        "Time:     {}",
        palette.mutedize(&cell(parsed.time.as_deref()))
    );
    println!(
        "Customer: {}",
        palette.mutedize(&cell(parsed.customer_name.as_deref()))
    );
}

fn print_customer(customer: &Customer, palette: &Palette) {
    println!("{} ({})", palette.accentize(&customer.name), customer.id);
    println!("Company:  {}", customer.company);
    println!("Role:     {}", palette.mutedize(&customer.role));
    println!("Industry: {}", palette.mutedize(&customer.industry));
    println!("Email:    {}", cell(customer.email.as_deref()));
    println!("Phone:    {}", cell(customer.phone.as_deref()));
    println!("Tags:     {}", customer.tags.join(", "));
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(cli: Cli, base_config: Option<&Config>) -> Result<(), AppError> {
    let settings = match base_config {
        Some(settings) if cli.config_override.is_empty() => settings.clone(),
        _ => load_config(&cli.config_override)?,
    };
    let palette = config::palette_for_theme(settings.theme.as_deref());

    match cli.command {
        Command::Parse { text } => {
            let parsed = schedule_core::parse_schedule(&text)
                .ok_or_else(|| AppError::invalid_input("nothing to schedule"))?;
            if cli.json {
                print_json(&parsed)?;
            } else {
                print_parsed(&parsed, &palette);
            }
        }
        Command::Add { text } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };

            let added = schedule_api::add_schedule_from_text(&text)?;
            if cli.json {
                let mut payload = schedule_json(&added.schedule);
                payload["parsed"] = serde_json::to_value(&added.parsed)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?;
                println!("{payload}");
            } else {
                let schedule = &added.schedule;
                println!(
                    "Added schedule: {} ({}) on {}",
                    palette.accentize(&schedule.title),
                    schedule.id,
                    describe_when(&schedule.date, schedule.time.as_deref())
                );
                match (&added.customer, added.parsed.customer_name.as_deref()) {
                    (Some(customer), _) => {
                        println!("Linked customer: {} ({})", customer.name, customer.id)
                    }
                    (None, Some(name)) => {
                        println!("{}", palette.mutedize(&format!("No customer matches {name}")))
                    }
                    (None, None) => {}
                }
            }
        }
        Command::New {
            title,
            date,
            time,
            customer,
            description,
        } => {
            let schedule = schedule_api::add_schedule(NewSchedule {
                title,
                date,
                time,
                customer_id: customer,
                description,
            })?;
            if cli.json {
                println!("{}", schedule_json(&schedule));
            } else {
                println!(
                    "Added schedule: {} ({}) on {}",
                    palette.accentize(&schedule.title),
                    schedule.id,
                    describe_when(&schedule.date, schedule.time.as_deref())
                );
            }
        }
        Command::List {
            customer,
            pending,
            completed,
        } => {
            let status = match (pending, completed) {
                (true, _) => Some(ScheduleStatus::Pending),
                (_, true) => Some(ScheduleStatus::Completed),
                _ => None,
            };
            let filter = ScheduleFilter {
                customer_id: customer,
                status,
            };
            let schedules = schedule_api::list_schedules(&filter)?;
            debug!("listing {} follow-ups", schedules.len());
            if cli.json {
                print_schedules_json(&schedules);
            } else {
                let customers = customer_api::list_customers()?;
                print_schedules_table(&schedules, &customers);
            }
        }
        Command::Toggle { id } => {
            let schedule = schedule_api::toggle_schedule(&id)?;
            if cli.json {
                println!("{}", schedule_json(&schedule));
            } else {
                println!(
                    "Marked {}: {} ({})",
                    schedule.status.label(),
                    schedule.title,
                    schedule.id
                );
            }
        }
        Command::Delete { id } => {
            let schedule = schedule_api::delete_schedule(&id)?;
            if cli.json {
                println!("{}", schedule_json(&schedule));
            } else {
                println!("Deleted schedule: {} ({})", schedule.title, schedule.id);
            }
        }
        Command::Stats => {
            let stats = schedule_api::schedule_stats()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "pending": stats.pending,
                        "completed": stats.completed,
                    })
                );
            } else {
                println!("Pending:   {}", stats.pending);
                println!("Completed: {}", stats.completed);
            }
        }
        Command::Customer { command } => run_customer_command(command, cli.json, &palette)?,
    }

    Ok(())
}

fn run_customer_command(
    command: CustomerCommand,
    json: bool,
    palette: &Palette,
) -> Result<(), AppError> {
    match command {
        CustomerCommand::Add {
            name,
            company,
            role,
            industry,
            email,
            phone,
            tags,
        } => {
            let customer = customer_api::add_customer(NewCustomer {
                name,
                company,
                role,
                industry,
                email,
                phone,
                tags,
            })?;
            if json {
                print_json(&customer)?;
            } else {
                println!(
                    "Added customer: {} ({})",
                    palette.accentize(&customer.name),
                    customer.id
                );
            }
        }
        CustomerCommand::List => {
            let customers = customer_api::list_customers()?;
            if json {
                print_json(&customers)?;
            } else {
                print_customers_table(&customers);
            }
        }
        CustomerCommand::Search { term, tag } => {
            let customers = customer_api::search_customers(&term, tag.as_deref())?;
            if json {
                print_json(&customers)?;
            } else {
                print_customers_table(&customers);
            }
        }
        CustomerCommand::Show { id } => {
            let customer = customer_api::get_customer(&id)?;
            let schedules = schedule_api::list_schedules(&ScheduleFilter {
                customer_id: Some(customer.id.clone()),
                status: None,
            })?;
            if json {
                let mut payload = serde_json::to_value(&customer)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?;
                payload["schedules"] =
                    serde_json::Value::Array(schedules.iter().map(schedule_json).collect());
                println!("{payload}");
            } else {
                print_customer(&customer, palette);
                println!();
                print_schedules_table(&schedules, std::slice::from_ref(&customer));
            }
        }
        CustomerCommand::Tag { command } => {
            let customer = match command {
                TagCommand::Add { id, tags } => customer_api::add_customer_tags(&id, &tags)?,
                TagCommand::Remove { id, tag } => customer_api::remove_customer_tag(&id, &tag)?,
            };
            if json {
                print_json(&customer)?;
            } else {
                println!(
                    "Tags for {}: {}",
                    palette.accentize(&customer.name),
                    customer.tags.join(", ")
                );
            }
        }
        CustomerCommand::Tags => {
            let tags = customer_api::all_tags()?;
            if json {
                print_json(&tags)?;
            } else if tags.is_empty() {
                println!("No tags.");
            } else {
                for tag in &tags {
                    println!("{tag}");
                }
            }
        }
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let settings = load_config(&[])?;
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let expanded = settings.expand_alias(line);
        let args = match split_command_line(&expanded) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("schedule".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, Some(&settings)) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        init_logging(false);
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);
    if let Err(err) = run_command(cli, None) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
