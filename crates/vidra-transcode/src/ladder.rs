//! The fixed rendition ladder and the master playlist built from it.
//!
//! Every source gets the same six rungs regardless of its own resolution;
//! a low source is scaled up rather than filtered out of the ladder.

/// One rendition rung: scale plus rate-control parameters.
#[derive(Debug, Clone)]
pub struct VariantSpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub video_kbps: u32,
    pub max_rate_kbps: u32,
    pub buf_size_kbps: u32,
    pub cq: u32,
    pub preset: &'static str,
}

impl VariantSpec {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Peak bandwidth advertised in the master playlist, in bits per second.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.video_kbps + AUDIO_KBPS) * 1000
    }
}

/// Audio parameters shared by every rung.
pub const AUDIO_KBPS: u32 = 64;
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Rendition ladder, highest rung first. Rung `n` is packaged into `v{n}/`.
pub const LADDER: [VariantSpec; 6] = [
    VariantSpec {
        name: "1080p",
        width: 1920,
        height: 1080,
        video_kbps: 5000,
        max_rate_kbps: 5350,
        buf_size_kbps: 7500,
        cq: 28,
        preset: "p4",
    },
    VariantSpec {
        name: "720p",
        width: 1280,
        height: 720,
        video_kbps: 2800,
        max_rate_kbps: 3000,
        buf_size_kbps: 4200,
        cq: 28,
        preset: "p4",
    },
    VariantSpec {
        name: "480p",
        width: 854,
        height: 480,
        video_kbps: 1400,
        max_rate_kbps: 1500,
        buf_size_kbps: 2100,
        cq: 28,
        preset: "p4",
    },
    VariantSpec {
        name: "360p",
        width: 640,
        height: 360,
        video_kbps: 800,
        max_rate_kbps: 850,
        buf_size_kbps: 1200,
        cq: 28,
        preset: "p4",
    },
    VariantSpec {
        name: "240p",
        width: 426,
        height: 240,
        video_kbps: 400,
        max_rate_kbps: 450,
        buf_size_kbps: 600,
        cq: 30,
        preset: "p4",
    },
    VariantSpec {
        name: "144p",
        width: 256,
        height: 144,
        video_kbps: 80,
        max_rate_kbps: 100,
        buf_size_kbps: 40,
        cq: 32,
        preset: "p7",
    },
];

/// Build the HLS master playlist referencing `v{n}/index.m3u8` per rung.
pub fn master_playlist(rungs: &[VariantSpec]) -> String {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");

    for (index, rung) in rungs.iter().enumerate() {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\nv{}/index.m3u8\n\n",
            rung.bandwidth(),
            rung.resolution(),
            index
        ));
    }

    playlist
}
