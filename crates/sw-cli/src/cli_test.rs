use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_parse_migrate_with_overrides() {
    let cli = Cli::try_parse_from([
        "sw", "-p", "proj", "migrate", "--shards", "a,b", "--threads", "8", "--target", "2.1",
        "-o", "json",
    ])
    .unwrap();
    assert_eq!(cli.global.project_dir, "proj");
    match cli.command {
        Commands::Migrate(args) => {
            assert_eq!(args.shards.as_deref(), Some("a,b"));
            assert_eq!(args.threads, Some(8));
            assert_eq!(args.target.as_deref(), Some("2.1"));
            assert_eq!(args.output, OutputFormat::Json);
            assert!(!args.quiet);
        }
        other => panic!("expected migrate, got {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["sw", "info", "-v", "-c", "alt.yml"]).unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.config.as_deref(), Some("alt.yml"));
    assert_eq!(cli.global.project_dir, ".");
}

#[test]
fn test_unlock_requires_shard() {
    assert!(Cli::try_parse_from(["sw", "unlock"]).is_err());
    let cli = Cli::try_parse_from(["sw", "unlock", "eu"]).unwrap();
    assert!(matches!(cli.command, Commands::Unlock(ref a) if a.shard == "eu"));
}
