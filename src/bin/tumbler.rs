use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashmap::DashMap;

use a2l_bob::config::{init_tracing, TumblerArgs};
use a2l_bob::keys::KeyBundle;
use a2l_bob::session::TumblerSession;
use a2l_bob::transport;
use a2l_bob::tumbler;

fn main() {
    let args = TumblerArgs::parse();
    init_tracing(args.verbose);

    let keys = KeyBundle::load_from_file(&args.keyfile).expect("failed to load key bundle");
    let tx = hex::decode(&args.tx).expect("--tx must be hex-encoded");
    let sessions: Arc<DashMap<String, TumblerSession>> = Arc::new(DashMap::new());
    let router = Arc::new(tumbler::router());

    let stop = transport::serve(&args.listen_addr, router, sessions, move |_client_id| {
        Ok(TumblerSession::new(keys.clone(), tx.clone()))
    });

    tracing::info!(addr = %args.listen_addr, "tumbler listening");
    loop {
        if stop.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_secs(3600));
    }
}
