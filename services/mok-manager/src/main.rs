use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::SeedableRng;

use mok_manager::hosted::{FileBackedStore, HostedShimLock, LogPlatform, StdConsole, StdPicker};
use mok_manager::menu::{status_code, Session};

fn main() {
    env_logger::init();
    log::info!("MOK manager starting");

    // seed once at entry; firmware derives this from the RTC the same way
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut rng = rand_chacha::ChaCha12Rng::seed_from_u64(seed);

    // the firmware image takes no arguments; these knobs only shape the
    // hosted harness around it
    let var_dir = PathBuf::from(std::env::var("MOK_VAR_DIR").unwrap_or_else(|_| "mok-vars".into()));
    let esp_dir = PathBuf::from(std::env::var("MOK_ESP_DIR").unwrap_or_else(|_| ".".into()));

    let mut store = FileBackedStore::load(&var_dir).expect("couldn't load variable state");
    let mut console = StdConsole::new();
    let mut picker = StdPicker::new(&esp_dir);
    let mut platform = LogPlatform;

    let result = Session {
        store: &mut store,
        console: &mut console,
        rng: &mut rng,
        picker: &mut picker,
        shim: &HostedShimLock,
        platform: &mut platform,
    }
    .run();

    if let Err(e) = store.persist() {
        log::error!("couldn't persist variable state: {}", e);
    }
    match &result {
        Ok(()) => log::info!("session complete"),
        Err(e) => log::warn!("session ended: {}", e),
    }
    std::process::exit(status_code(&result));
}
