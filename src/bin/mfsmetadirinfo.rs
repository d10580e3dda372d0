use std::process;

use clap::Parser;

use mfsmeta::{MetaResult, cli::DirInfoArgs, dirinfo, report};

fn main() {
    let args = DirInfoArgs::parse();
    mfsmeta::cli::init_logging(args.verbose);
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: DirInfoArgs) -> MetaResult<()> {
    let config = args.into_config()?;
    let result = dirinfo::run(&config)?;
    let mut rendered = Vec::new();
    report::write_dirinfo(&mut rendered, &result, config.format)?;
    report::emit(config.output.as_deref(), &rendered)?;
    Ok(())
}
