use converse_core::AudioClip;

/// Bucketed amplitude profile of a clip's first channel: mean absolute
/// sample value per bucket, scaled for display and clamped to 1.0.
pub fn waveform(clip: &AudioClip, buckets: usize) -> Vec<f32> {
    if buckets == 0 || clip.channels == 0 {
        return Vec::new();
    }
    let frames = clip.frames();
    if frames == 0 {
        return Vec::new();
    }

    let step = clip.channels as usize;
    let segment = (frames / buckets).max(1);
    let mut out = Vec::with_capacity(buckets);

    for b in 0..buckets {
        let start = b * segment;
        if start >= frames {
            break;
        }
        let end = (start + segment).min(frames);
        let sum: f32 = (start..end)
            .map(|frame| clip.samples[frame * step].abs())
            .sum();
        let mean = sum / (end - start) as f32;
        out.push((mean * 2.0).min(1.0));
    }

    out
}
