use super::clamp_pct;
use crate::models::{Alignment, VideoNode};

pub fn set_width(v: &mut VideoNode, pct: Option<u8>) {
    v.width_pct = clamp_pct(pct);
}

pub fn set_alignment(v: &mut VideoNode, alignment: Alignment) {
    v.alignment = alignment;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::video_from_url;

    #[test]
    fn test_video_size_and_alignment() {
        let mut v = video_from_url("https://youtu.be/abc").expect("video");
        set_width(&mut v, Some(5));
        set_alignment(&mut v, Alignment::Right);
        assert_eq!(v.width_pct, Some(10));
        assert_eq!(v.alignment, Alignment::Right);
    }
}
