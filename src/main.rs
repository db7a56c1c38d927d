use chrono::{Months, Utc};
use clap::{Arg, Command};
use log::LevelFilter;
use spam_buster::config::Config;
use spam_buster::dispatcher::EventDispatcher;
use spam_buster::event::{AuthorRef, SubredditRef, TriggerEvent};
use spam_buster::listener::Listener;
use spam_buster::models::{ContentItem, ItemKind, UserProfile};
use spam_buster::platform::memory::MemoryPlatform;
use spam_buster::platform::reddit::RedditClient;
use spam_buster::platform::ConsoleNotifier;
use spam_buster::purge::{PurgeOrchestrator, PurgeTarget, MENU_LABEL};
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let matches = Command::new("spam-buster")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Removes submissions from new low-karma accounts and purges spammers on demand")
        .long_about(format!(
            "spam-buster watches a subreddit for new posts and comments and removes those \
             written by accounts that are both young and low on comment karma.\n\
             The \"{MENU_LABEL}\" action (--purge) removes an author's recent content from \
             the subreddit and bans them."
        ))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/spam-buster.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("event")
                .long("event")
                .value_name("FILE")
                .help("Dispatch a single PostSubmit/CommentSubmit event stored as JSON")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("purge")
                .long("purge")
                .value_name("ID")
                .help("Bust the author of this post or comment: purge their content and ban them")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("location")
                .long("location")
                .value_name("KIND")
                .help("Whether the --purge target is a post or a comment")
                .value_parser(["post", "comment"])
                .default_value("post"),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Run in demonstration mode against an in-memory subreddit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        init_logger(verbose, None);
        generate_default_config(generate_path);
        return;
    }

    if matches.get_flag("demo") {
        init_logger(verbose, None);
        run_demo().await;
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/spam-buster.yaml");

    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    init_logger(verbose, config.logging.as_ref().map(|l| l.level.as_str()));

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    let client = match RedditClient::new(config.reddit.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Error creating Reddit client: {e}");
            process::exit(1);
        }
    };

    if let Some(event_file) = matches.get_one::<String>("event") {
        let dispatcher = EventDispatcher::new(client, Arc::new(config.settings.clone()));
        if let Err(e) = dispatch_event_file(&dispatcher, event_file).await {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        return;
    }

    if let Some(target_id) = matches.get_one::<String>("purge") {
        let location = matches
            .get_one::<String>("location")
            .map(String::as_str)
            .unwrap_or("post");
        let target = PurgeTarget::new(location, target_id);

        match PurgeOrchestrator::new(client)
            .purge_and_ban(&target, &ConsoleNotifier)
            .await
        {
            Ok(report) => log::info!(
                "Purge of {} in r/{} finished: {} removed, {} failed",
                report.username,
                report.subreddit_name,
                report.removed_count,
                report.failed_count
            ),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    for problem in config.validate() {
        log::warn!("Configuration: {problem}");
    }

    log::info!("Starting spam-buster for r/{}", config.reddit.subreddit);
    let dispatcher = EventDispatcher::new(client.clone(), Arc::new(config.settings.clone()));
    let listener = Listener::new(
        client,
        dispatcher,
        Duration::from_secs(config.listener.poll_interval_seconds.max(1)),
        config.listener.batch_size,
    );
    listener.run(tokio::signal::ctrl_c()).await;
}

/// `-v` wins over the configured level.
fn init_logger(verbose: bool, configured: Option<&str>) {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        configured
            .and_then(|level| level.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info)
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => println!("Default configuration written to: {path}"),
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("🔍 Testing configuration...");
    println!();
    println!("Subreddit: r/{}", config.reddit.subreddit);
    println!(
        "Listener: every {}s, {} items per kind",
        config.listener.poll_interval_seconds, config.listener.batch_size
    );

    let problems = config.validate();
    if problems.is_empty() {
        println!("✅ Configuration is valid");
        return;
    }

    println!("❌ Configuration validation failed:");
    for problem in problems {
        println!("  • {problem}");
    }
    process::exit(1);
}

async fn dispatch_event_file(dispatcher: &EventDispatcher, path: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let event = TriggerEvent::from_json(&content)?;
    let outcome = dispatcher.on_submission_event(&event).await;
    println!("{outcome:?}");
    Ok(())
}

async fn run_demo() {
    println!("🎭 Demo: r/demo with one brand new account and one regular");
    println!();

    let platform = Arc::new(MemoryPlatform::new("demo_mod"));
    let now = Utc::now();
    platform.add_user(UserProfile {
        id: "t2_fresh".to_string(),
        username: "fresh_account".to_string(),
        created_at: now.checked_sub_months(Months::new(1)).unwrap_or(now),
        comment_karma: 1,
    });
    platform.add_user(UserProfile {
        id: "t2_regular".to_string(),
        username: "regular".to_string(),
        created_at: now.checked_sub_months(Months::new(48)).unwrap_or(now),
        comment_karma: 4200,
    });

    let subreddit = SubredditRef {
        id: "t5_demo".to_string(),
        name: "demo".to_string(),
    };
    for (n, other) in [(1, "demo"), (2, "elsewhere"), (3, "demo")] {
        platform.add_item(ContentItem {
            id: format!("t3_fresh{n}"),
            kind: ItemKind::Post,
            author_name: "fresh_account".to_string(),
            subreddit_id: format!("t5_{other}"),
            subreddit_name: other.to_string(),
        });
    }

    let settings = Config::default().settings;
    let dispatcher = EventDispatcher::new(platform.clone(), Arc::new(settings));
    let events = [
        TriggerEvent::post_submit(
            AuthorRef {
                id: "t2_fresh".to_string(),
                name: "fresh_account".to_string(),
            },
            subreddit.clone(),
            "t3_fresh1",
        ),
        TriggerEvent::comment_submit(
            AuthorRef {
                id: "t2_regular".to_string(),
                name: "regular".to_string(),
            },
            subreddit.clone(),
            "t1_regular",
        ),
    ];
    for event in &events {
        let outcome = dispatcher.on_submission_event(event).await;
        let author = event.author.as_ref().map(|a| a.name.as_str());
        println!("{} by {:?}: {outcome:?}", event.event_type, author);
    }

    println!();
    println!("🔨 {MENU_LABEL} on t3_fresh3");
    match PurgeOrchestrator::new(platform.clone())
        .purge_and_ban(&PurgeTarget::new("post", "t3_fresh3"), &ConsoleNotifier)
        .await
    {
        Ok(report) => println!("Report: {report:?}"),
        Err(e) => println!("Purge failed: {e}"),
    }

    println!();
    println!("Removals: {:?}", platform.removals());
    println!("Bans: {:?}", platform.bans());
}
