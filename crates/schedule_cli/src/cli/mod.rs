use clap::{Parser, Subcommand};
use schedule_core::config::{ConfigOverrides, canonicalize_key};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sales follow-up scheduler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log parser and store activity to stderr (not available in the interactive session,
    /// which sets up logging once at startup)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how a phrase would be scheduled without saving it
    ///
    /// Example: schedule parse "明天下午两点拜访张总"
    Parse { text: String },
    /// Schedule a follow-up from a spoken or typed phrase
    ///
    /// Example: schedule add "1月15日和李经理开会"
    Add { text: Option<String> },
    /// Schedule a follow-up from explicit fields
    ///
    /// Example: schedule new --title 回访 --date 2025-03-11 --time 09:30
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: Option<String>,
        /// Customer id
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List follow-ups ordered by date and time
    ///
    /// Example: schedule list --pending
    List {
        /// Only follow-ups linked to this customer id
        #[arg(long)]
        customer: Option<String>,
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        #[arg(long)]
        completed: bool,
    },
    /// Flip a follow-up between pending and completed
    ///
    /// Example: schedule toggle schedule-1
    Toggle { id: String },
    /// Delete a follow-up
    ///
    /// Example: schedule delete schedule-1
    Delete { id: String },
    /// Count pending and completed follow-ups
    Stats,
    /// Manage the customer directory
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// Add a customer
    ///
    /// Example: schedule customer add --name 张总 --company 星河科技 --tags "重点,华东"
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        company: String,
        #[arg(long, default_value = "")]
        role: String,
        #[arg(long, default_value = "")]
        industry: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Separated by commas or spaces
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// List all customers
    List,
    /// Search name, company, industry and tags
    ///
    /// Example: schedule customer search 星河 --tag 重点
    Search {
        #[arg(default_value = "")]
        term: String,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show one customer and their follow-ups
    Show { id: String },
    /// Add or remove tags on a customer
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    /// List every tag in use
    Tags,
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Add tags, skipping ones the customer already has
    ///
    /// Example: schedule customer tag add manual-1 "续约,VIP"
    Add {
        id: String,
        /// Separated by commas or spaces
        tags: String,
    },
    /// Remove one tag
    ///
    /// Example: schedule customer tag remove manual-1 续约
    Remove { id: String, tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = match key_raw.split_once('.') {
        Some((field, rest)) => (field, Some(rest.trim())),
        None => (key_raw, None),
    };

    let canonical_field = canonicalize_key(field);
    match canonical_field.as_str() {
        "" => Err("override key cannot be empty".to_string()),
        "theme" if remainder.is_some() => Err("theme override cannot have subfields".to_string()),
        "theme" => Ok(ParsedConfigOverride {
            target: ConfigOverrideTarget::Theme,
            value,
        }),
        "aliases" | "alias" => {
            let alias_name = remainder
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| "aliases override requires an alias name".to_string())?;
            Ok(ParsedConfigOverride {
                target: ConfigOverrideTarget::Alias(alias_name.to_string()),
                value,
            })
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

/// Collects every `--config-override` into one set, later flags winning.
pub fn collect_overrides(raw_overrides: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for raw in raw_overrides {
        let parsed = parse_config_override(raw)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
        }
    }
    Ok(overrides)
}
