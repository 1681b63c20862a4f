//! Startup: baseline and delta table preparation

use crate::EngineError;
use emotion_delta::DeltaManager;
use face_landmarks::{LandmarkDetector, LandmarkExtractor, ReferenceClip};
use tracing::{info, warn};
use video_io::SeekableSource;

/// A reference clip together with its playable source
pub struct ClipSource<S> {
    pub clip: ReferenceClip,
    pub source: S,
}

impl<S: SeekableSource> ClipSource<S> {
    pub fn new(clip: ReferenceClip, source: S) -> Self {
        Self { clip, source }
    }
}

/// What startup did to obtain the delta table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Baseline landmark count
    pub landmarks: usize,
    /// Whether a stored snapshot was imported
    pub restored: bool,
    /// Restored emotions dropped for a landmark count unlike the baseline
    pub discarded: Vec<String>,
    /// Emotions extracted from their clips this session
    pub extracted: Vec<String>,
    /// Whether the table was written back to the store
    pub persisted: bool,
}

/// Prepare `manager` for rendering.
///
/// Extracts the baseline from the neutral clip, imports the stored snapshot
/// when there is one, and extracts every emotion the snapshot lacks. The table
/// is persisted whenever it differs from the stored snapshot. Any extraction failure (including a seek
/// timeout) aborts startup.
pub async fn initialize<D, S>(
    extractor: &mut LandmarkExtractor<D>,
    neutral: &mut ClipSource<S>,
    emotions: &mut [ClipSource<S>],
    manager: &mut DeltaManager,
) -> Result<StartupReport, EngineError>
where
    D: LandmarkDetector,
    S: SeekableSource,
{
    info!(
        "Initializing expression engine ({} emotion clips)",
        emotions.len()
    );

    let baseline = extractor
        .extract_clip(&mut neutral.source, &neutral.clip)
        .await?;
    let mut report = StartupReport {
        landmarks: baseline.len(),
        ..Default::default()
    };
    manager.set_baseline(baseline);

    report.restored = manager.restore()?;
    if report.restored {
        // Stale deltas from another detector configuration are re-extracted
        let stale: Vec<String> = manager
            .emotions()
            .filter(|name| {
                manager
                    .get_delta(name)
                    .is_some_and(|delta| delta.len() != report.landmarks)
            })
            .map(str::to_string)
            .collect();
        for name in stale {
            warn!("Discarding stored delta '{}' with mismatched topology", name);
            manager.remove_delta(&name);
            report.discarded.push(name);
        }
    }

    for entry in emotions.iter_mut() {
        if manager.get_delta(&entry.clip.name).is_some() {
            continue;
        }
        let landmarks = extractor
            .extract_clip(&mut entry.source, &entry.clip)
            .await?;
        manager.compute_delta(&landmarks, &entry.clip.name)?;
        report.extracted.push(entry.clip.name.clone());
    }

    if !report.extracted.is_empty() || !report.discarded.is_empty() {
        report.persisted = manager.persist()?;
    }

    info!(
        "Expression engine ready: {} deltas ({} restored, {} extracted)",
        manager.len(),
        if report.restored { "snapshot" } else { "none" },
        report.extracted.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_delta::{DeltaStore, DeltaTable, MemoryStore};
    use face_landmarks::{ExtractError, ExtractorConfig, FnDetector, Landmark};
    use image::{Rgb, RgbImage};
    use std::future::Future;
    use std::sync::Arc;
    use video_io::{CaptureError, FrameSequence, SequenceConfig, SourceFrame};

    const POINTS: usize = 4;

    /// Landmarks whose first x encodes the frame shade
    fn shade_detector() -> FnDetector<impl FnMut(&RgbImage) -> Option<Vec<Landmark>>> {
        FnDetector::new(POINTS, |frame: &RgbImage| {
            let shade = frame.get_pixel(0, 0)[0];
            if shade == 0 {
                return None;
            }
            let mut points = vec![Landmark::new(0.5, 0.5, 0.0); POINTS];
            points[0].x = shade as f32 / 100.0;
            Some(points)
        })
    }

    fn clip(name: &str, shade: u8) -> ClipSource<FrameSequence> {
        let images = vec![RgbImage::from_pixel(4, 4, Rgb([shade, shade, shade])); 10];
        let source = FrameSequence::new(images, SequenceConfig::reference(10.0)).unwrap();
        ClipSource::new(ReferenceClip::new(name, 0.5), source)
    }

    struct StalledSource;

    impl SeekableSource for StalledSource {
        fn seek(
            &mut self,
            _time_secs: f64,
        ) -> impl Future<Output = Result<SourceFrame, CaptureError>> + Send {
            std::future::pending()
        }

        fn duration_secs(&self) -> f64 {
            1.0
        }

        fn position_secs(&self) -> f64 {
            0.0
        }
    }

    #[tokio::test]
    async fn test_extracts_and_persists_all_emotions() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = DeltaManager::with_store(store.clone());
        let mut extractor = LandmarkExtractor::new(shade_detector(), ExtractorConfig::default());
        let mut neutral = clip("neutral", 20);
        let mut emotions = vec![clip("happy", 30), clip("sad", 10)];

        let report = initialize(&mut extractor, &mut neutral, &mut emotions, &mut manager)
            .await
            .unwrap();

        assert!(!report.restored);
        assert!(report.persisted);
        assert_eq!(report.extracted, vec!["happy", "sad"]);
        assert_eq!(report.landmarks, POINTS);
        assert!((manager.get_delta("happy").unwrap()[0].x - 0.1).abs() < 1e-6);
        assert!((manager.get_delta("sad").unwrap()[0].x + 0.1).abs() < 1e-6);
        assert!(store.has_snapshot());
        assert!((neutral.source.position_secs() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_restores_snapshot_without_extraction() {
        let mut table = DeltaTable::default();
        table.insert("happy", vec![Landmark::new(0.01, 0.0, 0.0); POINTS]);
        let store = Arc::new(MemoryStore::with_snapshot(table.clone()));
        let mut manager = DeltaManager::with_store(store.clone());
        let mut extractor = LandmarkExtractor::new(shade_detector(), ExtractorConfig::default());
        let mut neutral = clip("neutral", 20);
        // Faceless clip would fail if it were extracted
        let mut emotions = vec![clip("happy", 0)];

        let report = initialize(&mut extractor, &mut neutral, &mut emotions, &mut manager)
            .await
            .unwrap();

        assert!(report.restored);
        assert!(report.extracted.is_empty());
        assert!(!report.persisted);
        assert_eq!(manager.export(), table);
    }

    #[tokio::test]
    async fn test_snapshot_gaps_are_extracted() {
        let mut table = DeltaTable::default();
        table.insert("happy", vec![Landmark::default(); POINTS]);
        table.insert("old", vec![Landmark::default(); POINTS + 3]);
        let store = Arc::new(MemoryStore::with_snapshot(table));
        let mut manager = DeltaManager::with_store(store.clone());
        let mut extractor = LandmarkExtractor::new(shade_detector(), ExtractorConfig::default());
        let mut neutral = clip("neutral", 20);
        let mut emotions = vec![clip("happy", 30), clip("angry", 50)];

        let report = initialize(&mut extractor, &mut neutral, &mut emotions, &mut manager)
            .await
            .unwrap();

        assert_eq!(report.extracted, vec!["angry"]);
        assert_eq!(report.discarded, vec!["old"]);
        assert!(manager.get_delta("old").is_none());
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.names().collect::<Vec<_>>(), vec!["angry", "happy"]);
    }

    #[tokio::test]
    async fn test_discarded_deltas_are_removed_from_store() {
        let mut table = DeltaTable::default();
        table.insert("happy", vec![Landmark::default(); POINTS]);
        table.insert("old", vec![Landmark::default(); POINTS + 3]);
        let store = Arc::new(MemoryStore::with_snapshot(table));
        let mut manager = DeltaManager::with_store(store.clone());
        let mut extractor = LandmarkExtractor::new(shade_detector(), ExtractorConfig::default());
        let mut neutral = clip("neutral", 20);

        let report = initialize(&mut extractor, &mut neutral, &mut [], &mut manager)
            .await
            .unwrap();
        assert!(report.extracted.is_empty());
        assert!(report.persisted);
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.names().collect::<Vec<_>>(), vec!["happy"]);

        // Next startup finds nothing left to discard or write
        let mut manager = DeltaManager::with_store(store.clone());
        let report = initialize(&mut extractor, &mut neutral, &mut [], &mut manager)
            .await
            .unwrap();
        assert!(report.discarded.is_empty());
        assert!(!report.persisted);
    }

    #[tokio::test]
    async fn test_faceless_neutral_is_fatal() {
        let mut manager = DeltaManager::new();
        let mut extractor = LandmarkExtractor::new(shade_detector(), ExtractorConfig::default());
        let mut neutral = clip("neutral", 0);

        let err = initialize(&mut extractor, &mut neutral, &mut [], &mut manager)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Extraction(ExtractError::NoFace(name)) if name == "neutral"
        ));
        assert!(manager.baseline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_seek_aborts_startup() {
        let mut manager = DeltaManager::new();
        let mut extractor = LandmarkExtractor::new(shade_detector(), ExtractorConfig::strict());
        let mut neutral = ClipSource::new(ReferenceClip::new("neutral", 0.0), StalledSource);

        let err = initialize(&mut extractor, &mut neutral, &mut [], &mut manager)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Extraction(ExtractError::SeekTimeout { timeout_ms: 1000, .. })
        ));
    }

    #[tokio::test]
    async fn test_detector_not_ready_is_fatal() {
        let detector = FnDetector::not_ready(POINTS, |_: &RgbImage| None);
        let mut extractor = LandmarkExtractor::new(detector, ExtractorConfig::default());
        let mut manager = DeltaManager::new();
        let mut neutral = clip("neutral", 20);

        let err = initialize(&mut extractor, &mut neutral, &mut [], &mut manager)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Extraction(ExtractError::DetectorNotReady)
        ));
    }
}
