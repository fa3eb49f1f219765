use stellerom_map::prelude::*;
use stellerom_map::data::facilities_from_geojson;

/// Integration tests for real user interactions and scenarios
/// These tests drive the map the way a page would, through the headless provider
#[cfg(test)]
mod integration_tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    async fn open_map(storage: MemoryStore) -> FacilityMap<HeadlessProvider, MemoryStore> {
        init_logging();
        FacilityMap::initialize(HeadlessProvider::new(), storage, "map", MapConfig::default()).await
    }

    fn facility(id: &str, name: Option<&str>, lat: f64, lng: f64) -> Facility {
        Facility::new(id, name.map(str::to_string), LatLng::new(lat, lng))
    }

    fn rated(availability: u8, safety: u8, cleanliness: u8) -> Ratings {
        Ratings {
            availability: StarRating::new(availability).unwrap(),
            safety: StarRating::new(safety).unwrap(),
            cleanliness: StarRating::new(cleanliness).unwrap(),
        }
    }

    fn click(map: &mut FacilityMap<HeadlessProvider, MemoryStore>, lat: f64, lng: f64) {
        let id = map.map_id().unwrap();
        let events = map.provider().click(id, LatLng::new(lat, lng));
        map.handle_events(events);
    }

    fn deliver(map: &mut FacilityMap<HeadlessProvider, MemoryStore>, sample: PositionSample) {
        let events = map.provider().deliver_position(sample);
        map.handle_events(events);
    }

    /// A first visit starts over Norway at zoom 4
    #[tokio::test]
    async fn test_fresh_load_uses_default_viewport() {
        let map = open_map(MemoryStore::new()).await;

        let viewport = map.viewport();
        assert_eq!(viewport.center, LatLng::new(64.68, 9.39));
        assert_eq!(viewport.zoom, 4);
        assert_eq!(map.status().as_str(), "find and review a facility");

        let id = map.map_id().unwrap();
        let tiles = map.provider().tile_layers(id);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].max_zoom, 19);
    }

    /// The viewport written on one visit is restored on the next
    #[tokio::test]
    async fn test_viewport_survives_reload() {
        let mut first = open_map(MemoryStore::new()).await;
        let target = Viewport::new(LatLng::new(59.913_868, 10.752_245), 12);
        first.set_viewport(target).unwrap();
        assert!(first.persist_viewport().unwrap());
        // unchanged, nothing to write
        assert!(!first.persist_viewport().unwrap());

        let stored = first
            .storage()
            .get("stellerom.viewport")
            .expect("viewport was written");

        let second = open_map(MemoryStore::with_entry("stellerom.viewport", &stored)).await;
        assert_eq!(second.viewport(), target);
    }

    /// Malformed stored values never prevent the map from loading
    #[tokio::test]
    async fn test_malformed_stored_viewport_falls_back() {
        for raw in [
            "",
            "not json",
            "{}",
            r#"{"center":{"lat":"x","lng":9.0},"zoom":3}"#,
            r#"{"center":{"lat":123.0,"lng":9.0},"zoom":3}"#,
            r#"{"center":{"lat":60.0,"lng":9.0}}"#,
        ] {
            let map = open_map(MemoryStore::with_entry("stellerom.viewport", raw)).await;
            assert_eq!(map.viewport(), Viewport::default(), "stored value {:?}", raw);
            assert!(map.status() != StatusLine::Unavailable);
        }
    }

    /// Stored zoom beyond the provider's range is clamped on load
    #[tokio::test]
    async fn test_stored_zoom_is_clamped() {
        init_logging();
        let stored = r#"{"center":{"lat":60.0,"lng":10.0},"zoom":25}"#;
        let map = FacilityMap::initialize(
            HeadlessProvider::new().with_zoom_range(2, 18),
            MemoryStore::with_entry("stellerom.viewport", stored),
            "map",
            MapConfig::default(),
        )
        .await;
        assert_eq!(map.viewport().zoom, 18);
    }

    /// Pans are written at most once per interval
    #[tokio::test]
    async fn test_persistence_is_rate_limited() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();
        let start = Instant::now();

        let pan = map
            .provider_mut()
            .pan_to(id, Viewport::new(LatLng::new(60.0, 10.0), 8))
            .unwrap();
        map.handle_event(&pan).unwrap();

        assert!(!map.tick(start + Duration::from_secs(1)).unwrap());
        assert!(map.tick(start + Duration::from_secs(6)).unwrap());
        assert_eq!(map.storage().write_count(), 1);

        // nothing moved since the last write
        assert!(!map.tick(start + Duration::from_secs(12)).unwrap());
        assert_eq!(map.storage().write_count(), 1);
    }

    /// An unreviewed facility shows its name and the no-reviews text
    #[tokio::test]
    async fn test_unreviewed_facility_popup() {
        let mut map = open_map(MemoryStore::new()).await;
        let features = map
            .render_facilities(&[facility("a", Some("X"), 59.9, 10.7)])
            .unwrap();
        assert_eq!(features.len(), 1);

        let feature = map.features().feature_for("a").unwrap();
        let popup = map.provider().click_feature(feature).unwrap();
        assert_eq!(popup.title, "X");
        assert!(popup.text().contains("No reviews yet."));
        assert_eq!(popup.link.unwrap().href, "/rooms/a");
    }

    /// Rated and unnamed facilities render their ratings and the placeholder
    #[tokio::test]
    async fn test_rated_unnamed_facility_popup() {
        let mut map = open_map(MemoryStore::new()).await;
        let room = facility("b", None, 60.39, 5.32).with_ratings(rated(4, 5, 2));
        map.render_facilities(&[room]).unwrap();

        let feature = map.features().feature_for("b").unwrap();
        let popup = map.provider().click_feature(feature).unwrap();
        assert_eq!(popup.title, "Unnamed facility");
        assert_eq!(
            popup.items,
            vec!["Availability: 4/5", "Safety: 5/5", "Cleanliness: 2/5"]
        );
        assert!(!popup.text().contains("No reviews yet."));
    }

    /// Re-rendering replaces the previous markers instead of adding to them
    #[tokio::test]
    async fn test_rerender_leaves_no_stale_features() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();

        let first = [
            facility("a", Some("A"), 59.9, 10.7),
            facility("b", Some("B"), 60.4, 5.3),
            facility("c", Some("C"), 63.4, 10.4),
        ];
        assert_eq!(map.render_facilities(&first).unwrap().len(), 3);
        assert_eq!(map.provider().markers(id).len(), 3);

        let second = [facility("d", Some("D"), 69.6, 18.9)];
        assert_eq!(map.render_facilities(&second).unwrap().len(), 1);

        let markers = map.provider().markers(id);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].1.tooltip.as_deref(), Some("D"));
        assert_eq!(map.features().ids(), vec!["d"]);

        assert!(map.render_facilities(&[]).unwrap().is_empty());
        assert!(map.provider().markers(id).is_empty());
    }

    /// Invalid facilities are skipped, the rest still render
    #[tokio::test]
    async fn test_invalid_facilities_are_skipped() {
        let mut map = open_map(MemoryStore::new()).await;
        let facilities = [
            facility("a", Some("ok"), 59.9, 10.7),
            facility("b", Some("off the globe"), 95.0, 10.7),
            facility("c", Some("nan"), f64::NAN, 10.7),
            facility("", Some("no id"), 59.9, 10.7),
        ];
        let features = map.render_facilities(&facilities).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features.skipped(), 3);
    }

    /// Repeated ids are drawn as they come; lookups find the first
    #[tokio::test]
    async fn test_repeated_ids_all_render() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();
        let facilities = [
            facility("a", Some("first"), 59.9, 10.7),
            facility("a", Some("second"), 60.4, 5.3),
        ];
        let features = map.render_facilities(&facilities).unwrap();
        assert_eq!(features.len(), facilities.len());
        assert_eq!(features.skipped(), 0);
        assert_eq!(map.provider().markers(id).len(), 2);

        let first = map.features().feature_for("a").unwrap();
        assert_eq!(map.provider().click_feature(first).unwrap().title, "first");
    }

    /// The Room API collection renders straight onto the map
    #[tokio::test]
    async fn test_render_room_api_collection() {
        let raw = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "id": "a", "geometry": {"type": "Point", "coordinates": [10.75, 59.91]},
             "properties": {"name": "X", "ratings": null}},
            {"type": "Feature", "id": "b", "geometry": {"type": "Point", "coordinates": [5.32, 60.39]},
             "properties": {"name": "Y", "ratings": {"availability": 3, "safety": 3, "cleanliness": 3}}}
        ]}"#;
        let parsed = facilities_from_geojson(raw).unwrap();

        let mut map = open_map(MemoryStore::new()).await;
        map.render_facilities(&parsed.facilities).unwrap();

        let id = map.map_id().unwrap();
        let markers = map.provider().markers(id);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].1.position, LatLng::new(59.91, 10.75));
    }

    /// Clicking while placing opens the hand-off popup at the clicked point
    #[tokio::test]
    async fn test_place_and_click() {
        let mut map = open_map(MemoryStore::new()).await;
        map.start_placing().unwrap();
        assert_eq!(map.status().as_str(), "placing a facility — click the map");

        click(&mut map, 60.0, 10.0);

        let popups = map.provider().open_popups();
        assert_eq!(popups.len(), 1);
        let link = popups[0].link.as_ref().unwrap();
        assert!(link.href.contains("lat=60.0&lng=10.0"));
        assert_eq!(link.href, "/new-room?lat=60.0&lng=10.0");

        let hand_off = map.confirm_placement().unwrap();
        assert_eq!(hand_off.href, link.href);
    }

    /// A second click moves the single pin and popup
    #[tokio::test]
    async fn test_second_click_moves_pin_and_popup() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();
        map.start_placing().unwrap();

        click(&mut map, 60.0, 10.0);
        click(&mut map, 61.5, 11.25);

        let markers = map.provider().markers(id);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].1.icon, MarkerIcon::Pending);
        assert_eq!(markers[0].1.position, LatLng::new(61.5, 11.25));

        let popups = map.provider().open_popups();
        assert_eq!(popups.len(), 1);
        assert_eq!(
            popups[0].link.as_ref().unwrap().href,
            "/new-room?lat=61.5&lng=11.25"
        );
    }

    /// Once placing is cancelled, clicks no longer open a popup
    #[tokio::test]
    async fn test_cancel_placing_removes_listener() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();

        map.start_placing().unwrap();
        click(&mut map, 60.0, 10.0);
        let stale = map.provider().click(id, LatLng::new(61.0, 11.0));

        map.cancel_placing();
        assert_eq!(map.provider().active_listeners(), 0);
        assert!(map.provider().open_popups().is_empty());
        assert!(map.provider().markers(id).is_empty());

        click(&mut map, 60.0, 10.0);
        // events queued before the cancel are stale too
        map.handle_events(stale);
        assert!(map.provider().open_popups().is_empty());
        assert!(map.confirm_placement().is_none());
        assert_eq!(map.status().as_str(), "find and review a facility");
    }

    /// Re-entering placement starts a fresh session
    #[tokio::test]
    async fn test_reentering_placement_after_cancel() {
        let mut map = open_map(MemoryStore::new()).await;
        map.start_placing().unwrap();
        click(&mut map, 60.0, 10.0);
        map.cancel_placing();

        map.start_placing().unwrap();
        assert!(map.confirm_placement().is_none());
        click(&mut map, 62.0, 7.0);
        assert_eq!(map.provider().open_popups().len(), 1);
        assert_eq!(
            map.confirm_placement().unwrap().location,
            LatLng::new(62.0, 7.0)
        );
    }

    /// A user-closed popup reopens on the next click
    #[tokio::test]
    async fn test_closed_popup_reopens_on_click() {
        let mut map = open_map(MemoryStore::new()).await;
        map.start_placing().unwrap();
        click(&mut map, 60.0, 10.0);

        let popup = match map.mode() {
            Mode::PlacingFacility(session) => session.popup().unwrap(),
            other => panic!("expected placing, got {:?}", other),
        };
        map.provider_mut().close_popup_by_user(popup);
        assert!(map.provider().open_popups().is_empty());

        click(&mut map, 60.5, 10.0);
        assert_eq!(map.provider().open_popups().len(), 1);
    }

    /// The first fix recentres at zoom 15; later fixes only move the features
    #[tokio::test]
    async fn test_tracking_recentres_once() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();
        map.track_position().unwrap();
        assert_eq!(map.status().as_str(), "find and review a facility");

        deliver(&mut map, PositionSample::new(LatLng::new(59.0, 10.0), 25.0, 1_000));
        assert_eq!(map.viewport(), Viewport::new(LatLng::new(59.0, 10.0), 15));

        let markers = map.provider().markers(id);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].1.icon, MarkerIcon::Position);
        let circles = map.provider().circles(id);
        assert_eq!(circles.len(), 1);
        assert_eq!(circles[0].1.radius_meters, 25.0);

        // the user pans away; the next fix must not pull the view back
        let away = Viewport::new(LatLng::new(63.4, 10.4), 11);
        let pan = map.provider_mut().pan_to(id, away).unwrap();
        map.handle_event(&pan).unwrap();

        deliver(&mut map, PositionSample::new(LatLng::new(59.001, 10.002), 12.0, 2_000));
        assert_eq!(map.viewport(), away);

        let markers = map.provider().markers(id);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].1.position, LatLng::new(59.001, 10.002));
        let circles = map.provider().circles(id);
        assert_eq!(circles.len(), 1);
        assert_eq!(circles[0].1.radius_meters, 12.0);
        assert_eq!(circles[0].1.center, LatLng::new(59.001, 10.002));
    }

    /// Asking to track again recentres on the last fix without a new watch
    #[tokio::test]
    async fn test_track_again_recentres() {
        let mut map = open_map(MemoryStore::new()).await;
        map.track_position().unwrap();
        deliver(&mut map, PositionSample::new(LatLng::new(59.0, 10.0), 25.0, 1_000));
        map.set_viewport(Viewport::new(LatLng::new(65.0, 14.0), 6)).unwrap();

        map.track_position().unwrap();
        assert_eq!(map.provider().active_watches(), 1);
        assert_eq!(map.viewport(), Viewport::new(LatLng::new(59.0, 10.0), 15));
    }

    /// Only one mode is ever active and switching releases the other's handles
    #[tokio::test]
    async fn test_modes_are_exclusive() {
        let mut map = open_map(MemoryStore::new()).await;
        let id = map.map_id().unwrap();

        map.track_position().unwrap();
        deliver(&mut map, PositionSample::new(LatLng::new(59.0, 10.0), 25.0, 1_000));
        assert_eq!(map.provider().active_watches(), 1);
        let late = map
            .provider()
            .deliver_position(PositionSample::new(LatLng::new(59.5, 10.5), 5.0, 2_000));

        map.start_placing().unwrap();
        assert_eq!(map.provider().active_watches(), 0);
        assert_eq!(map.provider().active_listeners(), 1);
        assert!(map.provider().markers(id).is_empty());
        assert!(map.provider().circles(id).is_empty());

        // a late fix for the released watch changes nothing
        map.handle_events(late);
        assert!(map.provider().markers(id).is_empty());

        map.track_position().unwrap();
        assert_eq!(map.provider().active_watches(), 1);
        deliver(&mut map, PositionSample::new(LatLng::new(59.0, 10.0), 25.0, 3_000));
        assert_eq!(map.provider().active_listeners(), 0);

        map.stop_tracking();
        assert_eq!(map.provider().active_watches(), 0);
        assert!(matches!(map.mode(), Mode::Idle));
    }

    /// Denied permission is reported inline and the map stays usable
    #[tokio::test]
    async fn test_permission_denied() {
        init_logging();
        let mut map = FacilityMap::initialize(
            HeadlessProvider::new().with_geolocation_error(GeolocationError::PermissionDenied),
            MemoryStore::new(),
            "map",
            MapConfig::default(),
        )
        .await;

        map.track_position().unwrap();
        assert!(matches!(map.mode(), Mode::Idle));
        assert_eq!(map.last_error(), Some(GeolocationError::PermissionDenied));
        assert!(map.error_message().is_some());
        assert_eq!(map.status().as_str(), "find and review a facility");
    }

    /// A provider that cannot load leaves the map unavailable
    #[tokio::test]
    async fn test_load_failure_is_unavailable() {
        init_logging();
        let mut map = FacilityMap::initialize(
            HeadlessProvider::new().failing_load("tiles unreachable"),
            MemoryStore::new(),
            "map",
            MapConfig::default(),
        )
        .await;

        assert_eq!(map.status().as_str(), "map unavailable");
        assert!(matches!(map.surface_state(), SurfaceState::Unavailable(_)));
        assert!(map.render_facilities(&[facility("a", None, 59.9, 10.7)]).is_err());
        assert!(map.start_placing().is_err());
        assert!(!map.persist_viewport().unwrap());
    }

    /// Dropping the map releases every handle it acquired
    #[tokio::test]
    async fn test_drop_releases_everything() {
        let mut map = open_map(MemoryStore::new()).await;
        map.render_facilities(&[facility("a", Some("A"), 59.9, 10.7)])
            .unwrap();
        map.start_placing().unwrap();
        click(&mut map, 60.0, 10.0);

        map.teardown();
        assert_eq!(map.provider().map_count(), 0);
        assert_eq!(map.provider().feature_count(), 0);
        assert_eq!(map.provider().active_listeners(), 0);
        assert!(map.provider().open_popups().is_empty());
        assert!(map.storage().get("stellerom.viewport").is_some());
    }

    /// Dropping without an explicit teardown releases the same handles
    #[tokio::test]
    async fn test_drop_while_placing_releases_everything() {
        init_logging();
        let mut provider = HeadlessProvider::new();
        let mut storage = MemoryStore::new();
        {
            let mut map =
                FacilityMap::initialize(&mut provider, &mut storage, "map", MapConfig::default())
                    .await;
            map.render_facilities(&[facility("a", Some("A"), 59.9, 10.7)])
                .unwrap();
            map.start_placing().unwrap();
            let id = map.map_id().unwrap();
            let events = map.provider().click(id, LatLng::new(60.0, 10.0));
            map.handle_events(events);
            assert_eq!(map.provider().open_popups().len(), 1);
        }

        assert_eq!(provider.map_count(), 0);
        assert_eq!(provider.feature_count(), 0);
        assert_eq!(provider.active_listeners(), 0);
        assert!(provider.open_popups().is_empty());
        assert_eq!(storage.write_count(), 1);
        assert!(storage.get("stellerom.viewport").is_some());
    }

    /// Dropping while tracking clears the watch and its features
    #[tokio::test]
    async fn test_drop_while_tracking_releases_watch() {
        init_logging();
        let mut provider = HeadlessProvider::new();
        let mut storage = MemoryStore::new();
        {
            let mut map =
                FacilityMap::initialize(&mut provider, &mut storage, "map", MapConfig::default())
                    .await;
            map.track_position().unwrap();
            let events = map
                .provider()
                .deliver_position(PositionSample::new(LatLng::new(59.0, 10.0), 25.0, 1_000));
            map.handle_events(events);
            assert!(matches!(map.mode(), Mode::Tracking(_)));
        }

        assert_eq!(provider.active_watches(), 0);
        assert_eq!(provider.feature_count(), 0);
        assert_eq!(provider.map_count(), 0);
    }

    /// A denial that arrives after subscribing hands the placement back
    #[tokio::test]
    async fn test_async_denial_keeps_placement() {
        let mut map = open_map(MemoryStore::new()).await;
        map.start_placing().unwrap();
        click(&mut map, 60.0, 10.0);

        map.track_position().unwrap();
        let events = map.provider().fail_position(GeolocationError::PermissionDenied);
        map.handle_events(events);

        assert!(matches!(map.mode(), Mode::PlacingFacility(_)));
        assert!(map.error_message().unwrap().contains("denied"));
        assert_eq!(map.provider().active_watches(), 0);
        assert_eq!(map.provider().open_popups().len(), 1);
        assert_eq!(
            map.confirm_placement().unwrap().href,
            "/new-room?lat=60.0&lng=10.0"
        );
    }
}
