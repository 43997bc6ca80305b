#[macro_use] extern crate rocket;

use std::path::Path;
use std::sync::Arc;
use async_broadcast::{InactiveReceiver, Sender};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use crate::adapters::Adapters;
use crate::db::DbPoolFairing;
use crate::ruleset::Ruleset;
use crate::worker::SnapshotNotice;

mod adapters;
mod advancement;
mod api;
mod classes;
mod command;
mod datetime;
mod db;
mod events;
mod fetch;
mod roster;
mod ruleset;
mod season;
mod snapshot;
mod sync;
mod util;
mod worker;

const NOTICE_CAPACITY: usize = 64;

pub struct AppState {
    pub rules: Arc<Ruleset>,
    pub adapters: Arc<Adapters>,
    pub notices: Sender<SnapshotNotice>,
    /// kept so the channel stays open while no dashboard is subscribed
    pub notices_receiver: InactiveReceiver<SnapshotNotice>,
}
impl AppState {
    fn new(rules: Ruleset) -> anyhow::Result<Self> {
        let adapters = Adapters::new(&rules)?;
        let (mut sender, receiver) = async_broadcast::broadcast(NOTICE_CAPACITY);
        sender.set_overflow(true);
        Ok(Self {
            rules: Arc::new(rules),
            adapters: Arc::new(adapters),
            notices: sender,
            notices_receiver: receiver.deactivate(),
        })
    }
}

fn load_ruleset(figment: &Figment) -> anyhow::Result<Ruleset> {
    if cfg!(test) {
        return Ok(Ruleset::default())
    }
    match figment.extract_inner::<String>("ruleset_file") {
        Ok(path) => {
            info!("Loading ruleset: {path}");
            Ruleset::load(Path::new(&path))
        }
        Err(_) => {
            info!("No ruleset_file configured, using built-in ruleset");
            Ok(Ruleset::default())
        }
    }
}

#[launch]
fn rocket() -> _ {
    let rocket = rocket::build()
        .attach(DbPoolFairing())
        .attach(AdHoc::try_on_ignite("Ruleset", |rocket| async move {
            let state = load_ruleset(rocket.figment()).and_then(AppState::new);
            match state {
                Ok(state) => Ok(rocket.manage(state)),
                Err(err) => {
                    error!("Ruleset error: {err:?}");
                    Err(rocket)
                }
            }
        }))
        .attach(worker::stage());
    api::extend(rocket)
}
