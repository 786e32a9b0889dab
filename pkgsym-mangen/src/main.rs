use std::fs;

use clap::CommandFactory;
use pkgsym::{cli::PkgsymCli, utils::get_cargo_target};

/// Render `pkgsym.1` and one page per subcommand into `target/<profile>/man`.
fn main() -> anyhow::Result<()> {
    let out_dir = get_cargo_target()?.join("man");
    fs::create_dir_all(&out_dir)?;

    let command = PkgsymCli::command();
    let name = command.get_name().to_string();

    let pages = std::iter::once((name.clone(), command.clone())).chain(
        command
            .get_subcommands()
            .map(|sub| (format!("{name}-{}", sub.get_name()), sub.clone())),
    );

    for (page_name, page_command) in pages {
        let man = clap_mangen::Man::new(page_command).title(page_name.to_uppercase());
        let mut buffer: Vec<u8> = Vec::default();
        man.render(&mut buffer)?;

        let man_path = out_dir.join(format!("{page_name}.1"));
        fs::write(&man_path, buffer)?;
        println!("saved manpage to {}", man_path.display());
    }

    Ok(())
}
