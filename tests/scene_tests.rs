use fogmap::data::raster::encode_data_url;
use fogmap::prelude::*;
use image::{Rgba, RgbaImage};
use std::io::Cursor;

/// End-to-end tests for map loading, scene import/export and persistence
#[cfg(test)]
mod scene_tests {
    use super::*;

    fn png_data_url(width: u32, height: u32) -> String {
        let image = RgbaImage::from_pixel(width, height, Rgba([90, 120, 60, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        encode_data_url("image/png", bytes.get_ref())
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    async fn session_with_map(width: u32, height: u32) -> Session {
        let mut session = Session::default();
        let outcome = session
            .load_map(&png_data_url(width, height), &ImageAssetLoader::new())
            .await
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Applied { tokens: 0, .. }));
        session
    }

    /// Load, place, drag, export, import, zoom
    #[tokio::test]
    async fn test_tabletop_scenario() {
        let loader = ImageAssetLoader::new();
        let mut session = session_with_map(1000, 1000).await;
        assert_eq!(session.fog_buffer().dimensions(), (1000, 1000));
        assert_eq!(session.fog_buffer().revealed_pixel_count(), 0);

        let id = session.create_token(NewToken::new("goblin.png").label("Goblin"));
        let token = session.token(id).unwrap().clone();
        assert_eq!(token.position, Point::new(500.0, 500.0));
        assert_eq!(token.diameter, 60.0);
        assert!(session.fog_buffer().is_revealed(500, 500));
        assert!(session.fog_buffer().is_revealed(500, 588));
        assert!(session.fog_buffer().is_opaque(500, 592));

        // drag by +100 screen pixels at scale 1
        let start = session.map_to_screen(token.position);
        session
            .handle_input(&InputEvent::PointerDown {
                position: start,
                button: MouseButton::Left,
                modifiers: KeyModifiers::NONE,
            })
            .unwrap();
        let end = start.add(&Point::new(100.0, 0.0));
        session
            .handle_input(&InputEvent::PointerMove { position: end })
            .unwrap();
        session
            .handle_input(&InputEvent::PointerUp {
                position: end,
                button: MouseButton::Left,
            })
            .unwrap();

        assert_eq!(session.token(id).unwrap().position, Point::new(600.0, 500.0));
        assert!(session.fog_buffer().is_revealed(680, 500));

        let json = session.export_json().unwrap();
        let mut restored = Session::default();
        let outcome = restored.import_json(&json, &loader).await.unwrap();
        assert!(matches!(outcome, ImportOutcome::Applied { tokens: 1, .. }));

        let copy = &restored.tokens().tokens()[0];
        assert_eq!(copy.position, Point::new(600.0, 500.0));
        assert_eq!(copy.diameter, 60.0);
        assert_eq!(copy.color_index, 0);
        assert_eq!(copy.label, "Goblin");
        assert_eq!(copy.image_ref, "goblin.png");
        assert_eq!(restored.fog_buffer(), session.fog_buffer());
        assert_eq!(restored.view_state(), session.view_state());

        for _ in 0..3 {
            restored
                .handle_input(&InputEvent::Wheel {
                    delta: -120.0,
                    position: Point::new(5.0, 5.0),
                })
                .unwrap();
        }
        assert_close(restored.view_state().scale, 1.331);
    }

    /// View, colors and labels survive a round trip
    #[tokio::test]
    async fn test_round_trip_preserves_view_and_attributes() {
        let loader = ImageAssetLoader::new();
        let mut session = session_with_map(300, 200).await;
        let a = session.create_token(NewToken::new("a").at(Point::new(50.0, 50.0)).diameter(100.0));
        let b = session.create_token(NewToken::new("b").at(Point::new(250.0, 150.0)));
        session.cycle_token_color(a);
        session.cycle_token_color(b);
        session.cycle_token_color(b);
        session.rename_token(b, "Wyvern");
        session.zoom(-1.0);
        session.set_view(ViewState::new(session.view_state().scale, 12.5, -30.0));
        session.hide(Point::new(50.0, 50.0), 10.0);

        let mut restored = Session::default();
        restored
            .import_json(&session.export_json().unwrap(), &loader)
            .await
            .unwrap();

        let original: Vec<_> = session.tokens().tokens().iter().map(|t| t.template()).collect();
        let copied: Vec<_> = restored.tokens().tokens().iter().map(|t| t.template()).collect();
        assert_eq!(original, copied);
        assert_close(restored.view_state().scale, 1.1);
        assert_close(restored.view_state().pan_x, 12.5);
        assert_close(restored.view_state().pan_y, -30.0);
    }

    /// Color indices survive a round trip with a named, repetitive palette
    #[tokio::test]
    async fn test_round_trip_with_custom_palette() {
        let loader = ImageAssetLoader::new();
        let mut config = SessionConfig::default();
        config.tokens.palette = ["red", "green", "blue", "RED"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        let mut session = Session::new(config.clone());
        session
            .load_map(&png_data_url(100, 100), &loader)
            .await
            .unwrap();
        let blue = session.create_token(NewToken::new("a"));
        let upper = session.create_token(NewToken::new("b"));
        for _ in 0..2 {
            session.cycle_token_color(blue);
        }
        for _ in 0..3 {
            session.cycle_token_color(upper);
        }

        let mut restored = Session::new(config);
        restored
            .import_json(&session.export_json().unwrap(), &loader)
            .await
            .unwrap();
        let colors: Vec<_> = restored.tokens().tokens().iter().map(|t| t.color_index).collect();
        assert_eq!(colors, vec![2, 3]);
    }

    /// A scene written before labels, views and fog existed
    #[tokio::test]
    async fn test_legacy_scene_defaults() {
        let json = format!(
            r#"{{ "mapSrc": "{}", "pawns": [{{ "src": "x.png", "x": 20, "y": 20, "c": "rgb(241, 196, 15)" }}] }}"#,
            png_data_url(100, 100)
        );
        let mut session = Session::default();
        session
            .import_json(&json, &ImageAssetLoader::new())
            .await
            .unwrap();

        let token = &session.tokens().tokens()[0];
        assert_eq!(token.label, "Pawn");
        assert_eq!(token.diameter, 60.0);
        assert_eq!(token.color_index, 3);
        assert_eq!(session.view_state(), ViewState::default());
        assert!(session.fog_buffer().is_revealed(20, 20));
        assert!(session.fog_buffer().is_opaque(99, 99));
    }

    /// Only the most recent import may touch the session
    #[tokio::test]
    async fn test_superseded_import_is_discarded() {
        let loader = ImageAssetLoader::new();
        let mut session = Session::default();

        let first = format!(r#"{{ "mapSrc": "{}" }}"#, png_data_url(40, 40));
        let second = format!(r#"{{ "mapSrc": "{}" }}"#, png_data_url(80, 60));
        let stale = session.begin_import(&first).unwrap();
        let fresh = session.begin_import(&second).unwrap();

        let stale = stale.resolve(&loader).await.unwrap();
        let fresh = fresh.resolve(&loader).await.unwrap();

        assert!(matches!(
            session.finish_import(fresh),
            ImportOutcome::Applied { .. }
        ));
        assert!(matches!(
            session.finish_import(stale),
            ImportOutcome::Superseded { .. }
        ));
        assert_eq!(session.fog_buffer().dimensions(), (80, 60));
    }

    /// Malformed input fails before any state changes
    #[tokio::test]
    async fn test_invalid_scene_leaves_session_untouched() {
        let mut session = session_with_map(100, 100).await;
        session.create_token(NewToken::new("a"));
        let before = session.fog_buffer().clone();

        for bad in ["", "[]", "{ \"mapSrc\": null }", "{ \"version\": \"1.1\" }"] {
            let result = session.import_json(bad, &ImageAssetLoader::new()).await;
            assert!(matches!(result, Err(MapError::InvalidSceneFormat(_))));
        }
        assert_eq!(session.tokens().len(), 1);
        assert_eq!(session.fog_buffer(), &before);
    }

    /// Tokens are cleared when the import starts, so a broken asset leaves
    /// none behind unless clearing is deferred
    #[tokio::test]
    async fn test_failed_asset_load_and_token_clearing() {
        let broken = r#"{ "mapSrc": "data:image/png;base64,AAAA" }"#;

        let mut session = session_with_map(100, 100).await;
        session.create_token(NewToken::new("a"));
        let result = session.import_json(broken, &ImageAssetLoader::new()).await;
        assert!(matches!(result, Err(MapError::AssetLoadFailure(_))));
        assert!(session.tokens().is_empty());
        assert!(session.has_map());

        let mut config = SessionConfig::default();
        config.import.defer_token_clear = true;
        let mut deferred = Session::new(config);
        deferred.create_token(NewToken::new("a"));
        let result = deferred.import_json(broken, &ImageAssetLoader::new()).await;
        assert!(result.is_err());
        assert_eq!(deferred.tokens().len(), 1);
    }

    /// A new map resets tokens, fog and view
    #[tokio::test]
    async fn test_loading_new_map_resets_scene() {
        let mut session = session_with_map(100, 100).await;
        session.create_token(NewToken::new("a"));
        session.zoom(-1.0);

        session
            .load_map(&png_data_url(64, 32), &ImageAssetLoader::new())
            .await
            .unwrap();
        assert!(session.tokens().is_empty());
        assert_eq!(session.view_state(), ViewState::default());
        assert_eq!(session.fog_buffer().dimensions(), (64, 32));
        assert_eq!(session.fog_buffer().revealed_pixel_count(), 0);
    }

    /// Slots written to a store bring the scene back
    #[tokio::test]
    async fn test_memory_store_restore() {
        let loader = ImageAssetLoader::new();
        let store = MemoryStore::new();
        let mut session = session_with_map(120, 80).await;
        session.create_token(NewToken::new("a").at(Point::new(30.0, 30.0)).label("Scout"));
        assert_eq!(session.save_to(&store).await.unwrap(), 3);

        session.drag_token_by(Point::new(1.0, 1.0));
        session.start_token_drag(session.tokens().tokens()[0].id);
        session.drag_token_by(Point::new(10.0, 0.0));
        session.end_token_drag();
        assert_eq!(session.save_to(&store).await.unwrap(), 2);

        let mut restored = Session::default();
        let outcome = restored.restore_from_store(&store, &loader).await.unwrap();
        assert!(matches!(outcome, Some(ImportOutcome::Applied { tokens: 1, .. })));
        let token = &restored.tokens().tokens()[0];
        assert_eq!(token.position, Point::new(40.0, 30.0));
        assert_eq!(token.label, "Scout");
        assert_eq!(restored.fog_buffer(), session.fog_buffer());

        let empty = MemoryStore::new();
        assert_eq!(restored.restore_from_store(&empty, &loader).await.unwrap(), None);
    }

    /// Autosave coalesces rapid changes into the latest state
    #[tokio::test]
    async fn test_autosave_worker_round_trip() {
        let loader = ImageAssetLoader::new();
        let store = Arc::new(MemoryStore::new());
        let handle = spawn_autosave(store.clone(), Duration::from_secs(60));

        let mut session = session_with_map(50, 50).await;
        let id = session.create_token(NewToken::new("a"));
        assert_eq!(session.autosave(&handle).unwrap(), 3);
        for _ in 0..5 {
            session.resize_token(id, -1.0);
            session.autosave(&handle).unwrap();
        }
        assert_eq!(handle.flush().await.unwrap(), 3);
        assert_eq!(store.write_count(), 3);

        let mut restored = Session::default();
        restored
            .restore_from_store(store.as_ref(), &loader)
            .await
            .unwrap();
        assert_eq!(restored.tokens().tokens()[0].diameter, 85.0);
        handle.shutdown().await;
    }

    /// The file-backed store keeps one file per slot
    #[tokio::test]
    async fn test_file_store_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut session = session_with_map(60, 60).await;
        session.create_token(NewToken::new("a").label("Knight"));
        session.save_to(&store).await.unwrap();

        for slot in StoreSlot::ALL {
            assert!(store.slot_path(slot).exists(), "missing {}", slot);
        }

        let mut restored = Session::default();
        restored
            .restore_from_store(&store, &ImageAssetLoader::new())
            .await
            .unwrap();
        assert_eq!(restored.tokens().tokens()[0].label, "Knight");
    }
}
