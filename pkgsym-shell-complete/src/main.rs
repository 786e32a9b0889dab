use std::{fs, io::BufWriter};

use clap::{CommandFactory, ValueEnum};
use clap_complete::Shell;
use pkgsym::{cli::PkgsymCli, utils::get_cargo_target};

/// Write completion scripts into `target/<profile>/completions`, either for the shells named on
/// the command line or for every supported shell.
fn main() -> anyhow::Result<()> {
    let shells = std::env::args()
        .skip(1)
        .map(|arg| <Shell as ValueEnum>::from_str(&arg, true).map_err(|err| anyhow::anyhow!(err)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let shells = if shells.is_empty() {
        Shell::value_variants().to_vec()
    } else {
        shells
    };

    let out_dir = get_cargo_target()?.join("completions");
    fs::create_dir_all(&out_dir)?;
    let mut command = PkgsymCli::command();
    let name = command
        .get_bin_name()
        .unwrap_or_else(|| command.get_name())
        .to_string();

    for shell in shells {
        let out_path = out_dir.join(&name).with_extension(shell.to_string());
        let mut writer = BufWriter::new(fs::File::create(&out_path)?);
        println!("generating {shell} completions at {}", out_path.display());
        clap_complete::generate(shell, &mut command, &name, &mut writer);
    }

    Ok(())
}
