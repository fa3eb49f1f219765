use anyhow::{bail, Context};
use stellerom_map::{
    data::{facilities_from_geojson, ParsedFacilities},
    prelude::*,
};

/// Drives the facility map without a browser: loads rooms, renders them,
/// places a new facility and prints what a user would see.
///
/// Usage: `stellerom-app [rooms.geojson] [lat,lng]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let source = args.next();
    let placement = match args.next() {
        Some(raw) => parse_lat_lng(&raw)?,
        None => LatLng::new(60.0, 10.0),
    };

    let parsed = load_facilities(source.as_deref()).await?;
    println!(
        "loaded {} facilities ({} skipped)",
        parsed.facilities.len(),
        parsed.skipped
    );

    let mut map = FacilityMap::initialize(
        HeadlessProvider::new(),
        MemoryStore::new(),
        "map",
        MapConfig::default(),
    )
    .await;
    println!("status: {}", map.status());

    let features = map.render_facilities(&parsed.facilities)?;
    println!("rendered {} markers", features.len());

    let popups: Vec<String> = map
        .features()
        .iter()
        .take(3)
        .filter_map(|(_, feature)| map.provider().click_feature(feature))
        .map(|popup| popup.text())
        .collect();
    for popup in popups {
        println!("\n{}", popup);
    }

    map.start_placing()?;
    println!("\nstatus: {}", map.status());

    let id = map.map_id()?;
    let events = map.provider().click(id, placement);
    map.handle_events(events);

    for popup in map.provider().open_popups() {
        println!("\n{}", popup.text());
    }
    match map.confirm_placement() {
        Some(hand_off) => println!("\nhand-off: {}", hand_off.href),
        None => bail!("no location was chosen"),
    }

    map.cancel_placing();
    map.teardown();
    Ok(())
}

async fn load_facilities(source: Option<&str>) -> anyhow::Result<ParsedFacilities> {
    match source {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path))?;
            facilities_from_geojson(&raw).with_context(|| format!("parsing {}", path))
        }
        None => {
            let config = AppConfig::from_env()?;
            log::info!("Fetching rooms from {}", config.room_api);
            let client = RoomApiClient::from_config(&config)?;
            client
                .fetch_facilities()
                .await
                .context("fetching rooms from the Room API")
        }
    }
}

fn parse_lat_lng(raw: &str) -> anyhow::Result<LatLng> {
    let Some((lat, lng)) = raw.split_once(',') else {
        bail!("expected lat,lng but got {:?}", raw);
    };
    let position = LatLng::new(lat.trim().parse()?, lng.trim().parse()?);
    if !position.is_valid() {
        bail!("{} is not on the map", position);
    }
    Ok(position)
}
