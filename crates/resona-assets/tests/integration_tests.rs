//! Integration tests for the sound-bank asset subsystem.
//!
//! These drive full load/unload cycles against the mock engine and, where
//! disk is involved, tempfile-backed packs.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use resona_assets::*;
use resona_core::config::AudioSettings;
use resona_core::engine::AudioEngine;
use resona_core::path::AssetPath;
use resona_test_utils::MockAudioEngine;

// ============================================================================
// Helper Functions
// ============================================================================

fn test_context() -> (Arc<MockAudioEngine>, Arc<AssetRegistry>, AudioContext) {
    let engine = Arc::new(MockAudioEngine::new());
    let registry = Arc::new(AssetRegistry::new(engine.clone()));
    let ctx = AudioContext::new(engine.clone(), registry.clone(), AudioSettings::default());
    (engine, registry, ctx)
}

fn resident_media(id: u32, size: usize) -> MediaAsset {
    MediaAsset::new(
        id,
        PlatformKeyed::runtime(MediaAssetData {
            chunks: vec![MediaChunk::resident(false, vec![0u8; size])],
            ..Default::default()
        }),
    )
}

fn streamed_media(id: u32, prefetch: usize, full: usize) -> MediaAsset {
    MediaAsset::new(
        id,
        PlatformKeyed::runtime(MediaAssetData {
            is_streamed: true,
            chunks: vec![
                MediaChunk::resident(true, vec![0u8; prefetch]),
                MediaChunk::resident(false, vec![0u8; full]),
            ],
            ..Default::default()
        }),
    )
}

fn pump(registry: &AssetRegistry, ctx: &AudioContext) {
    registry.process_pending(ctx, ctx.settings.max_pending_loads);
}

// ============================================================================
// Media Table Accounting
// ============================================================================

#[test]
fn streamed_and_resident_media_register_the_documented_sizes() {
    let (engine, registry, ctx) = test_context();

    // M1: streamed, 4KB prefetch + 200KB full payload. M2: 50KB resident.
    registry.insert_media(AssetPath::new("Media/1"), Arc::new(streamed_media(1, 4096, 204_800)));
    registry.insert_media(AssetPath::new("Media/2"), Arc::new(resident_media(2, 51_200)));

    let asset = AssetBase::with_runtime_data(
        "Weapons",
        AssetData::WithMedia(BankDataWithMedia::new(
            BankData::new("Weapons", vec![1u8; 128]),
            vec![AssetPath::new("Media/1"), AssetPath::new("Media/2")],
        )),
    );

    asset.post_load(&ctx);
    pump(&registry, &ctx);

    // M1 registers only the prefetch chunk; the streaming backend owns the
    // full payload. M2 registers its single chunk directly.
    assert_eq!(engine.media_snapshot(), vec![(1, 4096), (2, 51_200)]);

    let m1 = registry.resolve_media(&AssetPath::new("Media/1")).unwrap();
    let streamed = m1.streamed_chunk(&ctx.settings.platform).unwrap();
    assert_eq!(streamed.data.len(), 204_800);
}

#[test]
fn load_then_unload_restores_both_engine_tables() {
    let (engine, registry, ctx) = test_context();
    registry.insert_media(AssetPath::new("Media/1"), Arc::new(streamed_media(1, 4096, 204_800)));
    registry.insert_media(AssetPath::new("Media/2"), Arc::new(resident_media(2, 51_200)));

    let asset = AssetBase::with_runtime_data(
        "Weapons",
        AssetData::WithMedia(BankDataWithMedia::new(
            BankData::new("Weapons", vec![1u8; 128]),
            vec![AssetPath::new("Media/1"), AssetPath::new("Media/2")],
        )),
    );

    let media_before = engine.media_snapshot();
    let banks_before = engine.bank_count();

    asset.load(&ctx);
    pump(&registry, &ctx);
    assert_ne!(engine.media_snapshot(), media_before);

    asset.unload(&ctx);
    pump(&registry, &ctx);

    assert_eq!(engine.media_snapshot(), media_before);
    assert_eq!(engine.bank_count(), banks_before);
}

#[test]
fn unload_twice_does_not_double_unregister() {
    let (engine, registry, ctx) = test_context();
    registry.insert_media(AssetPath::new("Media/1"), Arc::new(resident_media(1, 64)));

    let asset = AssetBase::with_runtime_data(
        "Weapons",
        AssetData::WithMedia(BankDataWithMedia::new(
            BankData::new("Weapons", vec![1u8; 16]),
            vec![AssetPath::new("Media/1")],
        )),
    );

    asset.load(&ctx);
    pump(&registry, &ctx);
    asset.unload(&ctx);
    asset.unload(&ctx);
    pump(&registry, &ctx);

    assert_eq!(engine.count_unregister_bank(), 1);
    assert_eq!(engine.count_unset_media(), 1);
    assert!(engine.registered_media_ids().is_empty());
}

// ============================================================================
// Failure Recovery
// ============================================================================

#[test]
fn rejected_bank_leaves_the_event_silent_but_the_process_alive() {
    let (engine, registry, ctx) = test_context();
    engine.reject_banks("malformed blob");
    registry.insert_media(AssetPath::new("Media/1"), Arc::new(resident_media(1, 64)));

    let asset = AssetBase::with_runtime_data(
        "Broken",
        AssetData::WithMedia(BankDataWithMedia::new(
            BankData::new("Broken", vec![1u8; 16]),
            vec![AssetPath::new("Media/1")],
        )),
    );

    // Load recovers locally: no panic, no media request, nothing loaded.
    asset.load(&ctx);
    pump(&registry, &ctx);

    assert_eq!(engine.bank_count(), 0);
    assert!(engine.registered_media_ids().is_empty());
    assert_eq!(registry.pending_count(), 0);
}

// ============================================================================
// Switch Containers End to End
// ============================================================================

#[test]
fn switch_gated_event_streams_media_as_selectors_come_and_go() {
    let (engine, registry, ctx) = test_context();
    registry.insert_media(AssetPath::new("Media/Sfx"), Arc::new(resident_media(1, 32)));
    registry.insert_media(AssetPath::new("Media/Gold"), Arc::new(resident_media(2, 32)));
    let gold = Arc::new(GroupValue::new(AssetPath::new("Switches/Gold")));
    registry.insert_group_value(gold.clone());

    let mut event_data = EventData::new(SwitchContainerData::new(
        BankDataWithMedia::new(
            BankData::new("Footsteps", vec![1u8; 64]),
            vec![AssetPath::new("Media/Sfx")],
        ),
        vec![SwitchContainerNode::new(
            Some(AssetPath::new("Switches/Gold")),
            vec![AssetPath::new("Media/Gold")],
            Vec::new(),
        )],
    ));
    event_data.max_attenuation_radius = 800.0;

    let event = AudioEvent::new(AssetBase::with_runtime_data(
        "Play_Footstep",
        AssetData::Event(event_data),
    ));

    event.load(&ctx);
    pump(&registry, &ctx);

    // Base media streams, gated media does not: the selector is inactive.
    assert_eq!(engine.registered_media_ids(), vec![1]);
    assert_eq!(event.max_attenuation_radius(&ctx), 800.0);

    // Game logic selects the gold surface.
    gold.load(&ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);
    assert_eq!(engine.registered_media_ids(), vec![1, 2]);

    // And deselects it again; only the gated media is released.
    gold.unload(&ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);
    assert_eq!(engine.registered_media_ids(), vec![1]);

    event.unload(&ctx);
    pump(&registry, &ctx);
    assert!(engine.registered_media_ids().is_empty());
    assert_eq!(engine.bank_count(), 0);
}

// ============================================================================
// Localization End to End
// ============================================================================

fn localized_platform_data(bank_name: &str, media_path: &str) -> AssetPlatformData {
    AssetPlatformData::runtime(AssetData::Event(EventData::new(SwitchContainerData::new(
        BankDataWithMedia::new(
            BankData::new(bank_name, vec![1u8; 32]),
            vec![AssetPath::new(media_path)],
        ),
        Vec::new(),
    ))))
}

#[test]
fn language_switch_swaps_banks_and_media() {
    let (engine, registry, ctx) = test_context();
    registry.insert_media(AssetPath::new("Media/VO_en"), Arc::new(resident_media(1, 64)));
    registry.insert_media(AssetPath::new("Media/VO_fr"), Arc::new(resident_media(2, 64)));
    registry.insert_platform_data(
        AssetPath::new("Events/Localized/en-US/Play_Dialogue"),
        Arc::new(localized_platform_data("Dialogue_en", "Media/VO_en")),
    );
    registry.insert_platform_data(
        AssetPath::new("Events/Localized/fr-FR/Play_Dialogue"),
        Arc::new(localized_platform_data("Dialogue_fr", "Media/VO_fr")),
    );

    let event =
        AudioEvent::new(AssetBase::new("Play_Dialogue", None)).with_localized_platform_data([
            (
                "en-US".to_string(),
                AssetPath::new("Events/Localized/en-US/Play_Dialogue"),
            ),
            (
                "fr-FR".to_string(),
                AssetPath::new("Events/Localized/fr-FR/Play_Dialogue"),
            ),
        ]);

    // Initial load picks up the engine's current language.
    event.load(&ctx);
    pump(&registry, &ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);
    assert_eq!(engine.registered_bank_names(), vec!["Dialogue_en"]);
    assert_eq!(engine.registered_media_ids(), vec![1]);

    // Switch to French: English is handed back, French streams in.
    let completed = Arc::new(AtomicBool::new(false));
    let observed = completed.clone();
    assert!(event.switch_language(
        &ctx,
        "fr-FR",
        Some(Box::new(move |success| {
            observed.store(success, Ordering::SeqCst);
        })),
    ));
    pump(&registry, &ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);

    assert!(completed.load(Ordering::SeqCst));
    assert_eq!(engine.registered_bank_names(), vec!["Dialogue_fr"]);
    assert_eq!(engine.registered_media_ids(), vec![2]);
    assert_eq!(engine.current_language(), "fr-FR");
}

#[test]
fn missing_language_falls_back_to_the_default_language_asset() {
    let (engine, registry, ctx) = test_context();
    registry.insert_media(AssetPath::new("Media/VO_en"), Arc::new(resident_media(1, 64)));
    registry.insert_platform_data(
        AssetPath::new("Events/Localized/en-US/Play_Dialogue"),
        Arc::new(localized_platform_data("Dialogue_en", "Media/VO_en")),
    );

    // fr-CA is in the map but was never cooked; en-US is the default.
    let event =
        AudioEvent::new(AssetBase::new("Play_Dialogue", None)).with_localized_platform_data([
            (
                "en-US".to_string(),
                AssetPath::new("Events/Localized/en-US/Play_Dialogue"),
            ),
            (
                "fr-CA".to_string(),
                AssetPath::new("Events/Localized/fr-CA/Play_Dialogue"),
            ),
        ]);

    assert!(event.switch_language(&ctx, "fr-CA", None));
    pump(&registry, &ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);

    assert_eq!(engine.registered_bank_names(), vec!["Dialogue_en"]);
}

#[test]
fn failed_switch_keeps_the_previous_language_loaded() {
    let (engine, registry, ctx) = test_context();
    registry.insert_media(AssetPath::new("Media/VO_en"), Arc::new(resident_media(1, 64)));
    registry.insert_platform_data(
        AssetPath::new("Events/Localized/en-US/Play_Dialogue"),
        Arc::new(localized_platform_data("Dialogue_en", "Media/VO_en")),
    );

    let event =
        AudioEvent::new(AssetBase::new("Play_Dialogue", None)).with_localized_platform_data([(
            "en-US".to_string(),
            AssetPath::new("Events/Localized/en-US/Play_Dialogue"),
        )]);

    event.load(&ctx);
    pump(&registry, &ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);
    assert_eq!(engine.registered_bank_names(), vec!["Dialogue_en"]);

    // ja-JP has no entry at all: verified before anything is unloaded.
    assert!(!event.switch_language(&ctx, "ja-JP", None));
    pump(&registry, &ctx);
    event.process_pending(&ctx);
    pump(&registry, &ctx);

    assert_eq!(engine.registered_bank_names(), vec!["Dialogue_en"]);
    assert_eq!(engine.registered_media_ids(), vec![1]);
    assert_eq!(engine.current_language(), "en-US");
}

// ============================================================================
// Cooked Packs and Streaming
// ============================================================================

#[test]
fn cooked_pack_streams_through_the_io_hook() {
    let (engine, _registry, ctx) = test_context();

    // Build-time payload: 16-byte prefetch, 256-byte full chunk.
    let full_payload: Vec<u8> = (0..256).map(|i| (i % 251) as u8).collect();
    let data = MediaAssetData {
        is_streamed: true,
        chunks: vec![
            MediaChunk::resident(true, vec![7u8; 16]),
            MediaChunk::resident(false, full_payload.clone()),
        ],
        ..Default::default()
    };

    let mut pack = Vec::new();
    serial::write_media_data(&mut pack, &data).unwrap();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("164958987.pck"), &pack).unwrap();

    // Runtime: the full chunk stays in the pack file.
    let read = serial::read_media_data_lazy(
        &mut Cursor::new(&pack),
        std::path::Path::new("164958987.pck"),
    )
    .unwrap();
    let media = MediaAsset::new(164_958_987, PlatformKeyed::runtime(read));

    // Load registers the resident prefetch only.
    media.load(&ctx);
    assert_eq!(engine.media_snapshot(), vec![(164_958_987, 16)]);

    // The hook serves the full chunk out of the pack by range.
    let hook = StreamingHook::new(Arc::new(FileReader::new(dir.path())));
    let descriptor = hook.open(&media, &ctx.settings.platform).unwrap();
    assert_eq!(descriptor.total_size, 256);

    let head = hook.read_sync(&descriptor, 0, 32).unwrap();
    assert_eq!(head, full_payload[..32]);
    let tail = hook.read_sync(&descriptor, 200, 56).unwrap();
    assert_eq!(tail, full_payload[200..]);

    media.unload(&ctx);
    assert!(engine.registered_media_ids().is_empty());
}

#[test]
fn cooked_platform_data_loads_like_the_editor_original() {
    let (engine, _registry, ctx) = test_context();

    // Editor shape with two platforms.
    let editor = AssetPlatformData::editor();
    editor.find_or_add("Windows", || {
        AssetData::Bank(BankData::new("Init_Windows", vec![1u8; 8]))
    });
    editor.find_or_add("PS4", || {
        AssetData::Bank(BankData::new("Init_PS4", vec![2u8; 8]))
    });

    let mut cooked = Vec::new();
    serial::write_platform_data(
        &mut cooked,
        &editor,
        &CookFilter::Cooked {
            platform: "Windows".to_string(),
        },
    )
    .unwrap();

    let read = serial::read_platform_data(&mut Cursor::new(&cooked)).unwrap();
    let asset = AssetBase::new("Init", Some(Arc::new(read)));

    asset.post_load(&ctx);
    assert_eq!(engine.registered_bank_names(), vec!["Init_Windows"]);
    asset.unload(&ctx);
}

// ============================================================================
// Build-Pipeline Concurrency
// ============================================================================

#[test]
fn parallel_workers_populate_per_platform_data_without_duplicates() {
    let asset = Arc::new(AssetBase::new("Weapons", None));
    let platforms = ["Windows", "PS4", "Switch", "XboxOne"];

    thread::scope(|scope| {
        for _ in 0..4 {
            let asset = asset.clone();
            scope.spawn(move || {
                for platform in platforms {
                    asset.find_or_add_asset_data(platform, || {
                        AssetData::Bank(BankData::empty("Weapons"))
                    });
                }
            });
        }
    });

    let platform_data = asset.platform_data().unwrap();
    assert_eq!(platform_data.data.platforms().len(), platforms.len());

    // Every worker resolved to the same entry per platform.
    for platform in platforms {
        let first = platform_data.current(platform).unwrap();
        let second = asset.find_or_add_asset_data(platform, || {
            AssetData::Bank(BankData::new("Weapons", vec![9u8; 4]))
        });
        assert!(Arc::ptr_eq(&first, &second));
    }
}
