use clap::Parser;
use costgate::cli::{
    handle_completions, handle_config_init, handle_config_validate, handle_status, run_daemon,
    run_once, Cli, Commands, ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run_once(args).await,
        Commands::Daemon(args) => run_daemon(args).await,
        Commands::Status(args) => {
            // Status never fails the process
            println!("{}", handle_status(&args));
            Ok(())
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
            ConfigCommands::Validate(args) => handle_config_validate(&args).map(|summary| {
                println!("{}", summary);
            }),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
