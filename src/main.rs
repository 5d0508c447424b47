mod animation;
mod app;
mod comment;
mod config;
mod dom;
mod overlay;
mod render;
mod scheduler;

fn main() {
    env_logger::init();
    log::info!("fadetoy starting up");

    if let Err(e) = app::run(config::AppConfig::default()) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
