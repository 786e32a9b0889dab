#![warn(clippy::all, clippy::pedantic)]

use std::{collections::HashSet, env};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use pkgsym::{
    backend::{LinkBackend, LinkMethod, LinkSource, NativeBackend, ShellBackend},
    cli::{ColorOverride, ConfigArgs, LinkArgs, PkgsymCli, PkgsymCommand, RecentArgs, UnlinkArgs},
    config::SymlinkerConfig,
    error::{LinkError, UnlinkError},
    prefs::FilePrefs,
    project::Project,
    recent::RecentHistory,
    refresh::{CommandRefresh, HostRefresh, NoRefresh},
    symlinker::Symlinker,
    utils::{display_relative_to, replace_home_with_tilde},
};

type CliSymlinker = Symlinker<Box<dyn LinkBackend>, FilePrefs, Box<dyn HostRefresh>>;

/// Build a [`Symlinker`] for the project given on the command line or found from the current
/// directory.
fn make_symlinker(cli: &PkgsymCli, config: &SymlinkerConfig) -> anyhow::Result<CliSymlinker> {
    let project = if let Some(root) = &cli.project {
        let canon_root = dunce::canonicalize(root)
            .with_context(|| format!("failed to canonicalize {}", root.display()))?;
        Project::at(canon_root)?
    } else {
        let cwd = env::current_dir().context("failed to get current directory")?;
        Project::locate(cwd)?
    };

    #[cfg(debug_assertions)]
    println!("project={project:#?}");

    let lenient = config.lenient();
    let backend: Box<dyn LinkBackend> = match config.method {
        LinkMethod::Native => Box::new(NativeBackend),
        LinkMethod::Shell => Box::new(ShellBackend::new(lenient)),
    };
    let refresh: Box<dyn HostRefresh> = match &config.refresh_command {
        Some(command) => Box::new(CommandRefresh {
            command: command.clone(),
            lenient,
        }),
        None => Box::new(NoRefresh),
    };
    let recent = RecentHistory::new(FilePrefs::new(config.prefs_path()), config.recent_limit);

    Ok(Symlinker::new(project, backend, recent, refresh))
}

fn link(symlinker: &mut CliSymlinker, args: &LinkArgs) -> anyhow::Result<()> {
    let source = match (&args.source, args.recent) {
        (_, Some(index)) => symlinker.recent_source(index)?,
        (Some(source), None) => source.clone(),
        (None, None) => return Err(LinkError::NoFolderSelected.into()),
    };

    let plan = symlinker
        .plan_link(&source)
        .with_context(|| format!("failed to link {}", replace_home_with_tilde(&source)))?;

    if args.dry_run {
        println!("would link {plan}");
        return Err(LinkError::DryRun.into());
    }

    symlinker
        .link(&plan)
        .with_context(|| format!("failed to link {}", replace_home_with_tilde(&source)))?;
    println!("linked {plan}");

    Ok(())
}

fn unlink(symlinker: &mut CliSymlinker, args: &UnlinkArgs) -> anyhow::Result<()> {
    let link = symlinker.resolve_link_arg(&args.link);
    let link = symlinker
        .plan_unlink(link)
        .with_context(|| format!("failed to unlink {}", args.link.display()))?;
    let shown = display_relative_to(&link, symlinker.project().root());

    if args.dry_run {
        println!("would unlink {}", shown.cyan());
        return Err(UnlinkError::DryRun.into());
    }

    symlinker
        .unlink(&link)
        .with_context(|| format!("failed to unlink {shown}"))?;
    println!("unlinked {}", shown.cyan());

    Ok(())
}

fn list(symlinker: &CliSymlinker) -> anyhow::Result<()> {
    let linked = symlinker.linked_packages()?;
    if linked.is_empty() {
        println!("No symbolic linked packages in project");
        return Ok(());
    }

    println!("{}", format!("Linked packages ({})", linked.len()).bold());
    let root = symlinker.project().root();
    for package in &linked {
        let title = match &package.manifest {
            Some(manifest) => manifest.to_string().bold().to_string(),
            None => "<no package.json>".dimmed().to_string(),
        };
        let source = match &package.source {
            LinkSource::Resolved(_) => package.source.to_string().bright_green(),
            LinkSource::Unresolved => package.source.to_string().yellow(),
        };
        println!("{title}");
        println!(
            "  {} -> {source}",
            display_relative_to(&package.link_path, root).cyan(),
        );
    }

    Ok(())
}

fn recent(symlinker: &mut CliSymlinker, args: &RecentArgs) -> anyhow::Result<()> {
    if args.clear {
        symlinker.clear_recent()?;
        println!("cleared recent packages");
        return Ok(());
    }

    let entries = symlinker.recent_entries()?;
    let linked_names = symlinker
        .linked_packages()?
        .into_iter()
        .filter_map(|linked| linked.manifest.map(|m| m.name))
        .collect::<HashSet<_>>();

    if entries.iter().all(|entry| entry.manifest.is_none()) {
        println!("No recent packages");
        return Ok(());
    }

    println!("{}", "Recent packages".bold());
    for (i, entry) in entries.iter().enumerate() {
        // folders that moved away or lost their package.json are hidden, but keep their index
        let Some(manifest) = &entry.manifest else {
            continue;
        };
        let status = if linked_names.contains(&manifest.name) {
            "linked".dimmed().to_string()
        } else {
            String::new()
        };
        println!("[{}] {} {status}", i + 1, manifest.to_string().bold());
        println!(
            "    {}",
            replace_home_with_tilde(&entry.source_path).bright_green()
        );
    }

    Ok(())
}

fn show_config(config: &SymlinkerConfig, args: &ConfigArgs) -> anyhow::Result<()> {
    // OS config always takes precedence
    if args.save_os {
        config.save_os()?;
        println!("saved {}", replace_home_with_tilde(config.os_disk_path()));
    }

    if args.save {
        config.save()?;
        println!("saved {}", replace_home_with_tilde(config.disk_path()));
    }

    if !(args.save || args.save_os) {
        println!("# {}", replace_home_with_tilde(config.disk_path()).dimmed());
        print!(
            "{}",
            toml::to_string_pretty(config).context("failed to serialize config")?
        );
        println!("# lenient_exit_codes = {} (effective)", config.lenient());
        println!(
            "# prefs_file = {:?} (effective)",
            replace_home_with_tilde(config.prefs_path())
        );
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = PkgsymCli::parse();

    #[cfg(debug_assertions)]
    println!("cli={cli:#?}");

    match cli.color_override {
        ColorOverride::Always => colored::control::set_override(true),
        ColorOverride::Auto => colored::control::unset_override(),
        ColorOverride::Never => colored::control::set_override(false),
    }

    let config = SymlinkerConfig::init(SymlinkerConfig::default_dir(), &cli)
        .context("failed to load config")?;

    #[cfg(debug_assertions)]
    println!("config={config:#?}");

    match &cli.command {
        PkgsymCommand::Link(args) => link(&mut make_symlinker(&cli, &config)?, args),
        PkgsymCommand::Unlink(args) => unlink(&mut make_symlinker(&cli, &config)?, args),
        PkgsymCommand::List => list(&make_symlinker(&cli, &config)?),
        PkgsymCommand::Recent(args) => recent(&mut make_symlinker(&cli, &config)?, args),
        // works outside of a project
        PkgsymCommand::Config(args) => show_config(&config, args),
    }
}
