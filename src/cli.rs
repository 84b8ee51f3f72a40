use clap::builder::styling::{AnsiColor, Color};
use clap::builder::styling::{Style, Styles};
use clap::{ColorChoice, Parser, Subcommand};

pub const BANNER: &str = "\x1b[0;91m ██████ ██       ██████  ███    ██  █████  ██      ██ ████████ ██    ██\x1b[0m\n\
                      \x1b[0;93m██      ██      ██    ██ ████   ██ ██   ██ ██      ██    ██     ██  ██\x1b[0m\n\
                      \x1b[0;92m██      ██      ██    ██ ██ ██  ██ ███████ ██      ██    ██      ████\x1b[0m\n\
                      \x1b[0;96m██      ██      ██    ██ ██  ██ ██ ██   ██ ██      ██    ██       ██\x1b[0m\n\
                      \x1b[0;95m ██████ ███████  ██████  ██   ████ ██   ██ ███████ ██    ██       ██\x1b[0m\n";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Clonality comparison pipeline",
    version = env!("CARGO_PKG_VERSION"),
    about = BANNER,
    color = ColorChoice::Always,
    styles = get_styles(),
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the group-comparison analysis on a directory of sample files
    #[command(alias = "r")]
    Run {
        /// Input directory path with per-sample .tsv files and metadata
        #[arg(short, long, default_value_t = String::from("."))]
        input: String,

        /// Name of the group-assignment file inside the input directory
        #[arg(short, long, default_value_t = String::from("metadata.tsv"))]
        metadata: String,

        /// Name of the configuration file inside the input directory
        #[arg(short, long, default_value_t = String::from("config.cfg"))]
        config: String,
    },

    /// Generate a configuration file with the documented defaults
    #[command(alias = "g")]
    Generate {
        /// Where to write the configuration file
        #[arg(short, long, default_value_t = String::from("config.cfg"))]
        output: String,
    },
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}
