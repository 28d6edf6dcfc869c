use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashmap::DashMap;

use a2l_bob::alice;
use a2l_bob::config::{init_tracing, AliceArgs};
use a2l_bob::keys::KeyBundle;
use a2l_bob::session::AliceSession;
use a2l_bob::transport;

fn main() {
    let args = AliceArgs::parse();
    init_tracing(args.verbose);

    let keys = KeyBundle::load_from_file(&args.keyfile).expect("failed to load key bundle");
    let sessions: Arc<DashMap<String, AliceSession>> = Arc::new(DashMap::new());
    let router = Arc::new(alice::router());

    // Alice's own (e', s') pair comes from her promise sub-protocol with
    // the Tumbler, out of scope here (see SPEC_FULL.md); a deployment
    // wires that result in before accepting puzzle_share requests.
    let e_prime = a2l_bob::group::Scalar::zero();
    let s_prime = a2l_bob::group::Scalar::zero();

    let stop = transport::serve(&args.listen_addr, router, sessions, move |_client_id| {
        Ok(AliceSession::new(keys.clone(), Vec::new(), e_prime, s_prime))
    });

    tracing::info!(addr = %args.listen_addr, "alice listening");
    loop {
        if stop.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_secs(3600));
    }
}
