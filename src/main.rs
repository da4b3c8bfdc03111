//! strata - compile style objects to atomic CSS

use std::process::ExitCode;

use clap::Parser;
use indexmap::IndexMap;

use strata::Style;
use strata::style::{StyleContext, StyleInput, StyleOptions, WritingDirection};

#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about = "Compile style objects to atomic CSS", long_about = None)]
#[command(after_help = "EXAMPLES:
    strata styles.json                      Print the stylesheet
    strata styles.json -r root,title        Resolve an array of named styles
    strata styles.json -r root --rtl        Resolve for a right-to-left layout")]
struct Cli {
    /// JSON file mapping style names to style objects
    #[arg(value_name = "INPUT")]
    input: String,

    /// Resolve these styles, in order, as one style array
    #[arg(short, long, value_delimiter = ',')]
    resolve: Vec<String>,

    /// Resolve with right-to-left writing direction
    #[arg(long)]
    rtl: bool,

    /// Derive the writing direction from a locale tag (e.g. "ar-EG")
    #[arg(long, conflicts_with = "rtl")]
    locale: Option<String>,

    /// Suppress the stylesheet dump
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let text = std::fs::read_to_string(&cli.input).map_err(|e| format!("{}: {e}", cli.input))?;
    let styles: IndexMap<String, Style> =
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", cli.input))?;

    let mut context = StyleContext::default();
    let created: IndexMap<String, _> = context.create(styles).into_iter().collect();

    if !cli.resolve.is_empty() {
        let mut entries = Vec::with_capacity(cli.resolve.len());
        for name in &cli.resolve {
            let handle = created
                .get(name)
                .ok_or_else(|| format!("no style named {name:?}"))?;
            entries.push(StyleInput::from(*handle));
        }

        let direction = match (&cli.locale, cli.rtl) {
            (Some(locale), _) => WritingDirection::from_locale(locale),
            (None, true) => WritingDirection::Rtl,
            (None, false) => WritingDirection::Ltr,
        };
        let options = StyleOptions::default().with_direction(direction);
        let resolved = context.resolve(&StyleInput::list(entries), &options);

        println!("Direction: {}", direction.as_str());
        println!("Classes: {}", resolved.class_name);
        if let Some(inline) = &resolved.inline {
            println!("Inline: {}", inline.to_css_text());
        }
    }

    if !cli.quiet {
        let snapshot = context.sheet_snapshot();
        if !cli.resolve.is_empty() {
            println!();
        }
        println!("<style id=\"{}\">", snapshot.id);
        println!("{}", snapshot.text);
        println!("</style>");
    }

    Ok(())
}
