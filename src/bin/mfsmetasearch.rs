use std::process;

use clap::Parser;

use mfsmeta::{MetaResult, cli::SearchArgs, report, search};

fn main() {
    let args = SearchArgs::parse();
    mfsmeta::cli::init_logging(args.verbose);
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: SearchArgs) -> MetaResult<()> {
    let config = args.into_config()?;
    let result = search::run(&config)?;
    let mut rendered = Vec::new();
    report::write_search(&mut rendered, &result, config.format)?;
    report::emit(config.output.as_deref(), &rendered)?;
    Ok(())
}
