use std::sync::Mutex;

use super::*;
use crate::video::codec::VideoFrameSender;

#[derive(Default)]
struct Log {
    created: Vec<VideoConfig>,
    decoded: Vec<(SessionId, bool)>,
    closed: Vec<SessionId>,
}

/// Emits one solid frame per chunk whose first byte is not 0xFF; 0xFF chunks fail.
struct EchoCodec {
    cfg: VideoConfig,
    frames: VideoFrameSender,
    log: Arc<Mutex<Log>>,
}

impl VideoCodec for EchoCodec {
    fn decode(&mut self, chunk: &VideoChunk) -> DisplayResult<()> {
        self.log
            .lock()
            .unwrap()
            .decoded
            .push((self.cfg.session, chunk.keyframe));
        if chunk.data.first() == Some(&0xFF) {
            return Err(DisplayError::decode("corrupt chunk"));
        }
        let px = [chunk.data.first().copied().unwrap_or(0), 0, 0, 255];
        let bytes = px
            .iter()
            .copied()
            .cycle()
            .take((self.cfg.width * self.cfg.height * 4) as usize)
            .collect();
        let image = DecodedImage::from_rgba8(self.cfg.width, self.cfg.height, bytes)?;
        self.frames
            .send(DecodedVideoFrame {
                session: self.cfg.session,
                image,
            })
            .map_err(|e| DisplayError::decode(e.to_string()))
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed.push(self.cfg.session);
    }
}

struct EchoFactory {
    log: Arc<Mutex<Log>>,
    max_width: u32,
}

impl VideoCodecFactory for EchoFactory {
    fn create(
        &self,
        cfg: VideoConfig,
        frames: VideoFrameSender,
    ) -> DisplayResult<Box<dyn VideoCodec>> {
        if cfg.width > self.max_width {
            return Err(DisplayError::configuration("too wide"));
        }
        self.log.lock().unwrap().created.push(cfg);
        Ok(Box::new(EchoCodec {
            cfg,
            frames,
            log: Arc::clone(&self.log),
        }))
    }
}

fn channels(max_width: u32) -> (VideoChannels, Arc<Mutex<Log>>) {
    let log = Arc::new(Mutex::new(Log::default()));
    let factory = EchoFactory {
        log: Arc::clone(&log),
        max_width,
    };
    (VideoChannels::new(Some(Arc::new(factory))), log)
}

fn key(b: u8) -> VideoChunk {
    VideoChunk::new(true, vec![b])
}

fn delta(b: u8) -> VideoChunk {
    VideoChunk::new(false, vec![b])
}

#[test]
fn first_chunk_configures_session() {
    let (mut ch, log) = channels(64);
    let rect = PixelRect::new(4, 4, 2, 2);
    assert!(ch.get(4, 4).is_none());

    assert_eq!(ch.submit(rect, &key(1)).unwrap(), VideoSubmit::Forwarded);
    let sub = ch.get(4, 4).unwrap();
    assert_eq!(sub.state(), VideoState::Configured);
    assert_eq!(sub.bound_rect(), Some(rect));
    assert_eq!(log.lock().unwrap().created.len(), 1);

    let ready = ch.drain_ready();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].0, rect);
}

#[test]
fn deltas_before_first_keyframe_are_dropped() {
    let (mut ch, log) = channels(64);
    let rect = PixelRect::new(0, 0, 1, 1);
    assert_eq!(
        ch.submit(rect, &delta(1)).unwrap(),
        VideoSubmit::AwaitingKeyframe
    );
    assert!(log.lock().unwrap().decoded.is_empty());
    ch.submit(rect, &key(2)).unwrap();
    assert_eq!(ch.submit(rect, &delta(3)).unwrap(), VideoSubmit::Forwarded);
    assert_eq!(ch.drain_ready().len(), 2);
}

#[test]
fn size_change_recreates_session_and_drops_old_frames() {
    let (mut ch, log) = channels(64);
    ch.submit(PixelRect::new(0, 0, 2, 2), &key(1)).unwrap();
    let first = ch.get(0, 0).unwrap().session().unwrap();

    ch.submit(PixelRect::new(0, 0, 4, 4), &key(2)).unwrap();
    let second = ch.get(0, 0).unwrap().session().unwrap();
    assert_ne!(first, second);
    assert_eq!(log.lock().unwrap().closed, vec![first]);

    let ready = ch.drain_ready();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].0, PixelRect::new(0, 0, 4, 4));
}

#[test]
fn zero_area_rect_keeps_prior_session() {
    let (mut ch, _log) = channels(64);
    ch.submit(PixelRect::new(0, 0, 2, 2), &key(1)).unwrap();
    let before = ch.get(0, 0).unwrap().session();

    let err = ch.submit(PixelRect::new(0, 0, 0, 2), &key(1)).unwrap_err();
    assert!(matches!(err, DisplayError::Configuration(_)));
    assert_eq!(ch.get(0, 0).unwrap().session(), before);
}

#[test]
fn codec_refusal_leaves_subchannel_unconfigured() {
    let (mut ch, _log) = channels(8);
    let err = ch.submit(PixelRect::new(0, 0, 16, 2), &key(1)).unwrap_err();
    assert!(matches!(err, DisplayError::Configuration(_)));
    assert_eq!(ch.get(0, 0).unwrap().state(), VideoState::Unconfigured);
    assert_eq!(ch.configured(), 0);
}

#[test]
fn refused_resize_keeps_prior_session() {
    let (mut ch, log) = channels(8);
    let small = PixelRect::new(0, 0, 4, 2);
    ch.submit(small, &key(1)).unwrap();
    let before = ch.get(0, 0).unwrap().session();

    let err = ch.submit(PixelRect::new(0, 0, 16, 2), &key(2)).unwrap_err();
    assert!(matches!(err, DisplayError::Configuration(_)));
    let sub = ch.get(0, 0).unwrap();
    assert_eq!(sub.state(), VideoState::Configured);
    assert_eq!(sub.session(), before);
    assert_eq!(sub.bound_rect(), Some(small));
    assert!(log.lock().unwrap().closed.is_empty());

    assert_eq!(ch.submit(small, &delta(3)).unwrap(), VideoSubmit::Forwarded);
    assert_eq!(ch.drain_ready().len(), 2);
}

#[test]
fn decode_error_keeps_session() {
    let (mut ch, _log) = channels(64);
    let rect = PixelRect::new(0, 0, 1, 1);
    ch.submit(rect, &key(1)).unwrap();
    let session = ch.get(0, 0).unwrap().session();

    assert!(ch.submit(rect, &delta(0xFF)).is_err());
    assert_eq!(ch.get(0, 0).unwrap().session(), session);
    assert_eq!(ch.submit(rect, &delta(3)).unwrap(), VideoSubmit::Forwarded);
}

#[test]
fn missing_factory_is_configuration_error() {
    let mut ch = VideoChannels::new(None);
    assert!(matches!(
        ch.submit(PixelRect::new(0, 0, 1, 1), &key(1)),
        Err(DisplayError::Configuration(_))
    ));
}

#[test]
fn teardown_all_closes_sessions() {
    let (mut ch, log) = channels(64);
    ch.submit(PixelRect::new(0, 0, 1, 1), &key(1)).unwrap();
    ch.submit(PixelRect::new(8, 0, 1, 1), &key(1)).unwrap();
    assert_eq!(ch.configured(), 2);
    ch.teardown_all();
    assert_eq!(ch.configured(), 0);
    assert_eq!(log.lock().unwrap().closed.len(), 2);
    assert!(ch.drain_ready().is_empty());
}

#[test]
fn evict_idle_closes_stale_sessions() {
    let (mut ch, log) = channels(64);
    ch.submit(PixelRect::new(0, 0, 1, 1), &key(1)).unwrap();
    ch.submit(PixelRect::new(8, 0, 1, 1), &key(1)).unwrap();

    assert_eq!(ch.evict_idle(Instant::now(), Duration::from_secs(60)), 0);
    assert_eq!(ch.configured(), 2);

    let later = Instant::now() + Duration::from_secs(60);
    assert_eq!(ch.evict_idle(later, Duration::from_secs(1)), 2);
    assert_eq!(ch.configured(), 0);
    assert!(ch.get(0, 0).is_none());
    assert_eq!(log.lock().unwrap().closed.len(), 2);
    assert!(ch.drain_ready().is_empty());
}
