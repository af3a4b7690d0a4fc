use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use inapp_browser::config::{load_options, BrowserOptions};
use inapp_browser::platform::headless::{
    HeadlessChrome, HeadlessLauncher, HeadlessPermissions, HeadlessRenderer,
};
use inapp_browser::platform::storage::FsScratchStorage;
use inapp_browser::route::{classify, RouteDecision};
use inapp_browser::{Browser, Host, RendererEvent};

const USAGE: &str = "usage: inapp-browser <url> [--config <options.toml>]";

struct Args {
    url: String,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut url = None;
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => return Err("--config needs a path".to_string()),
            },
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if url.is_none() => url = Some(arg),
            _ => return Err(format!("unexpected argument {}", arg)),
        }
    }
    let url = url.ok_or_else(|| USAGE.to_string())?;
    Ok(Args { url, config })
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let options = match &args.config {
        Some(path) => load_options(path),
        None => BrowserOptions::default(),
    };
    let timeout = Duration::from_secs(options.http_timeout_secs.saturating_mul(2).max(1));

    let cache_dir = std::env::temp_dir().join("inapp-browser");
    let renderer = HeadlessRenderer::new();
    let requested = renderer.requested();
    let (events_tx, events_rx) = mpsc::channel();

    let host = Host {
        renderer: Box::new(renderer),
        chrome: Box::new(HeadlessChrome),
        permissions: Box::new(HeadlessPermissions),
        launcher: Box::new(HeadlessLauncher),
        storage: Box::new(FsScratchStorage::new(
            cache_dir,
            options.file_provider_authority.clone(),
        )),
        events: Box::new(events_tx),
    };

    let mut browser = match Browser::new("cli", options, host) {
        Ok(browser) => browser,
        Err(e) => {
            eprintln!("cannot start browser: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match classify(&args.url) {
        RouteDecision::LoadEmbedded(url) => {
            browser.open(&url, Vec::new());
            if browser.wait_for_load(timeout) {
                let loaded = requested.lock().ok().and_then(|r| r.last().cloned());
                if let Some(loaded) = loaded {
                    browser.handle_event(RendererEvent::PageStarted {
                        url: loaded.clone(),
                    });
                    browser.handle_event(RendererEvent::PageFinished { url: loaded });
                }
            } else {
                eprintln!("load of {} did not finish within {:?}", url, timeout);
            }
        }
        RouteDecision::LaunchExternal(intent) => {
            println!("external: {:?}", intent);
            match intent.resolve() {
                Ok(spec) => println!("intent: {:?}", spec),
                Err(e) => println!("not launchable: {}", e),
            }
        }
        RouteDecision::Unhandled => println!("unhandled: left to the renderer"),
    }

    browser.close();

    for event in events_rx.try_iter() {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Cannot serialize {:?}: {}", event, e),
        }
    }
    ExitCode::SUCCESS
}
