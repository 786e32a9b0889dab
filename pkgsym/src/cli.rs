use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use clap::{
    Args, Parser, Subcommand, ValueEnum, ValueHint,
    builder::{Styles, styling::AnsiColor},
};

use crate::{backend::LinkMethod, utils::expand_into_pathbuf};

/// Get the color styles for the CLI help menu.
fn __cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Yellow.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Parses a `&str` slice as a [`PathBuf`], expand `~` and environment variables and clean the path.
/// Paths are not canonicalized here so that a missing folder is reported with the rest of the
/// link validation.
///
/// # Arguments
///
/// - `s` - `&str` slice.
fn cli_parse_pathbuf(s: &str) -> Result<PathBuf, String> {
    expand_into_pathbuf(s).map_err(|err| err.to_string())
}

/// Override the color setting. Default is [`ColorOverride::Auto`].
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ColorOverride {
    /// Always display color (i.e. force it).
    Always,
    /// Automatically determine if color should be used or not.
    #[default]
    Auto,
    /// Never display color.
    Never,
}

/// pkgsym links local package folders into a Unity project's Packages folder.
#[derive(Clone, Debug, Parser)]
#[command(about, long_about = None, styles=__cli_styles(), version)]
pub struct PkgsymCli {
    /// Project root (the folder containing `Packages`). [default: nearest parent of the current
    /// directory with both `Assets` and `Packages`]
    #[arg(short, long, global = true, value_parser = cli_parse_pathbuf, value_hint = ValueHint::DirPath)]
    pub project: Option<PathBuf>,
    /// When to show color.
    #[arg(long = "color", global = true, default_value_t = ColorOverride::default(), value_name = "WHEN")]
    pub color_override: ColorOverride,
    /// How to create, remove and read links. Overrides the config file.
    #[arg(short, long, global = true, value_name = "METHOD")]
    pub method: Option<LinkMethod>,

    #[command(subcommand)]
    pub command: PkgsymCommand,
}

#[derive(Clone, Debug, Subcommand)]
pub enum PkgsymCommand {
    /// Link a package folder (one containing a package.json) into the project.
    Link(LinkArgs),
    /// Remove a package link. The linked folder itself is left alone.
    Unlink(UnlinkArgs),
    /// List the packages linked into the project.
    List,
    /// List recently linked packages.
    Recent(RecentArgs),
    /// Show or save the configuration.
    Config(ConfigArgs),
}

#[derive(Clone, Debug, Args)]
pub struct LinkArgs {
    /// Package folder to link.
    #[arg(required_unless_present = "recent", value_parser = cli_parse_pathbuf, value_hint = ValueHint::DirPath)]
    pub source: Option<PathBuf>,
    /// Link the recent package with this index (see `pkgsym recent`) instead.
    #[arg(short, long, value_name = "INDEX", conflicts_with = "source")]
    pub recent: Option<usize>,
    /// Dry run; show what would be linked, but do not link it.
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct UnlinkArgs {
    /// Link to remove, either a path or the name of a package in the project's Packages folder.
    #[arg(required = true, value_parser = cli_parse_pathbuf, value_hint = ValueHint::AnyPath)]
    pub link: PathBuf,
    /// Dry run; show what would be removed, but do not remove it.
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct RecentArgs {
    /// Forget all recent packages.
    #[arg(long)]
    pub clear: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ConfigArgs {
    /// Save the current configuration (including CLI overrides) to the config file. WARNING:
    /// overwrites any existing file!
    #[arg(short = 's', long)]
    pub save: bool,
    /// Save to an OS-specific config instead of the generic one. It takes precedence over the
    /// generic one when both exist.
    #[arg(short = 'o', long)]
    pub save_os: bool,
}

impl Display for ColorOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorOverride::Always => "always",
            ColorOverride::Auto => "auto",
            ColorOverride::Never => "never",
        };

        write!(f, "{s}")
    }
}
