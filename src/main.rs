use moire::BackgroundConfig;

fn main() {
    env_logger::init();

    if let Err(e) = moire::run(BackgroundConfig::default()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
