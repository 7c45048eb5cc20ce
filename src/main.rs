use anyhow::Result;
use std::sync::Arc;
use voicecast_rs::modules::soundboard::Soundboard;
use voicecast_rs::{audio, config, console, event, modules, net};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = config::load_or_default().await;

    let connector = Arc::new(net::TcpSinkConnector::new(&config.destinations));
    let audio = audio::init(
        audio::EngineConfig {
            decoder: config.decoder_path.clone(),
            cache_dir: config.cache_dir.clone(),
        },
        connector,
    )
    .await;

    let bus = event::EventBus::new();
    event::debug(&bus);

    let ctx = modules::ModuleContext { audio };
    let module_list: Vec<Arc<dyn modules::Module>> =
        vec![Arc::new(Soundboard::new(&config.soundboard))];
    modules::init(&bus, ctx, module_list);

    console::start(&bus, config.console_channel);

    tokio::signal::ctrl_c().await?;

    Ok(())
}
