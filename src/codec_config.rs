//! Bit-exact assemblers for AVC/HEVC decoder configuration records, plus
//! the Annex-B<->AVC1 NAL framing conversion and ADTS stripping that feed
//! them. All outputs are big-endian, per ISO/IEC 14496-15.
//!
//! These are pure functions: no I/O, no shared state, nothing async.

use bytes::{BufMut, Bytes, BytesMut};

/// Strips a leading Annex-B start code (`00 00 01` or `00 00 00 01`) from a
/// NAL unit, if present.
fn strip_start_code(nalu: &[u8]) -> &[u8] {
    if nalu.len() >= 4 && nalu[0] == 0 && nalu[1] == 0 && nalu[2] == 0 && nalu[3] == 1 {
        &nalu[4..]
    } else if nalu.len() >= 3 && nalu[0] == 0 && nalu[1] == 0 && nalu[2] == 1 {
        &nalu[3..]
    } else {
        nalu
    }
}

/// Converts a sequence of Annex-B NAL units (each optionally start-code
/// prefixed) into AVC1 framing: a 4-byte big-endian length followed by the
/// stripped payload, concatenated in input order. Empty input yields empty
/// output.
pub fn annex_b_to_avc1<'a, I, T>(nalus: I) -> Bytes
where
    I: IntoIterator<Item = &'a T>,
    T: AsRef<[u8]> + ?Sized + 'a,
{
    let mut out = BytesMut::new();
    for nalu in nalus {
        let payload = strip_start_code(nalu.as_ref());
        out.put_u32(payload.len() as u32);
        out.put_slice(payload);
    }
    out.freeze()
}

/// Strips an ADTS header from an AAC frame, if one is present. Idempotent:
/// calling this on already-stripped data is a no-op because raw AAC data
/// does not begin with the `FFF` ADTS sync word pattern this checks for.
pub fn strip_adts(data: &[u8]) -> Bytes {
    if data.len() < 7 {
        return Bytes::copy_from_slice(data);
    }
    if data[0] != 0xFF || (data[1] & 0xF0) != 0xF0 {
        return Bytes::copy_from_slice(data);
    }
    let header_size = if (data[1] & 0x01) == 0 { 9 } else { 7 };
    if data.len() <= header_size {
        return Bytes::copy_from_slice(data);
    }
    Bytes::copy_from_slice(&data[header_size..])
}

/// Builds an AVCDecoderConfigurationRecord (ISO/IEC 14496-15 §5.2.4.1.1)
/// from the in-band SPS/PPS. `sps` must begin with its 1-byte NAL header.
/// Returns `None` if the inputs are too short to be a valid record.
pub fn build_avc_decoder_config(sps: &[u8], pps: &[u8]) -> Option<Bytes> {
    if sps.len() < 4 || pps.is_empty() {
        return None;
    }
    let mut out = BytesMut::with_capacity(11 + sps.len() + pps.len());
    out.put_u8(0x01); // configurationVersion
    out.put_u8(sps[1]); // AVCProfileIndication
    out.put_u8(sps[2]); // profile_compatibility
    out.put_u8(sps[3]); // AVCLevelIndication
    out.put_u8(0xFF); // reserved(6) | lengthSizeMinusOne=3
    out.put_u8(0xE1); // reserved(3) | numOfSequenceParameterSets=1
    out.put_u16(sps.len() as u16);
    out.put_slice(sps);
    out.put_u8(0x01); // numOfPictureParameterSets
    out.put_u16(pps.len() as u16);
    out.put_slice(pps);
    Some(out.freeze())
}

/// MSB-first bit reader over a byte slice, with Exp-Golomb decoding for the
/// `ue(v)`/`se(v)` fields ITU-T H.264/H.265 SPS syntax is built from.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0 }
    }

    fn read_bit(&mut self) -> Option<u8> {
        if self.bit_pos >= self.data.len() * 8 {
            return None;
        }
        let byte = self.data[self.bit_pos / 8];
        let shift = 7 - (self.bit_pos % 8);
        self.bit_pos += 1;
        Some((byte >> shift) & 1)
    }

    fn read_bits(&mut self, n: u32) -> Option<u64> {
        let mut v = 0u64;
        for _ in 0..n {
            v = (v << 1) | self.read_bit()? as u64;
        }
        Some(v)
    }

    /// `ue(v)`: count leading zero bits, then read that many more as the
    /// suffix. Bails out past 32 leading zeros -- no valid SPS field needs
    /// a code that long, and it means we have drifted off the rails.
    fn read_ue(&mut self) -> Option<u32> {
        let mut zeros = 0u32;
        while self.read_bit()? == 0 {
            zeros += 1;
            if zeros > 32 {
                return None;
            }
        }
        if zeros == 0 {
            return Some(0);
        }
        let suffix = self.read_bits(zeros)? as u32;
        Some((1u32 << zeros) - 1 + suffix)
    }

    fn read_se(&mut self) -> Option<i32> {
        let k = self.read_ue()?;
        let v = ((k + 1) / 2) as i32;
        Some(if k % 2 == 0 { -v } else { v })
    }
}

/// Removes `emulation_prevention_three_byte` (the `00 00 03 -> 00 00`
/// escaping Annex B applies to NAL payloads) so Exp-Golomb fields can be
/// read from the true RBSP bitstream.
fn strip_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zero_run = 0u8;
    for &b in data {
        if zero_run >= 2 && b == 0x03 {
            zero_run = 0;
            continue;
        }
        out.push(b);
        zero_run = if b == 0 { zero_run + 1 } else { 0 };
    }
    out
}

/// Geometry and profile fields pulled out of an H.264 SPS: the MIME codec
/// string plus everything `VideoInfo` needs to describe the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoGeometry {
    pub codec: String,
    pub width: u16,
    pub height: u16,
    pub profile_idc: u8,
    pub level_idc: u8,
    pub constraint_flags: u8,
}

/// Walks an H.264 SPS (ITU-T H.264 §7.3.2.1.1) far enough to recover
/// `pic_width_in_luma_samples`/`pic_height_in_luma_samples` after cropping.
/// `sps` must begin with its 1-byte NAL header.
pub fn parse_h264_sps(sps: &[u8]) -> Option<VideoGeometry> {
    if sps.len() < 4 {
        return None;
    }
    let profile_idc = sps[1];
    let constraint_flags = sps[2];
    let level_idc = sps[3];
    let rbsp = strip_emulation_prevention(&sps[4..]);
    let mut r = BitReader::new(&rbsp);

    r.read_ue()?; // seq_parameter_set_id
    let mut chroma_format_idc = 1u32;
    // High-profile family SPSes carry an extra block of chroma/bit-depth/
    // scaling-list fields before the frame-size fields.
    if matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    ) {
        chroma_format_idc = r.read_ue()?;
        if chroma_format_idc == 3 {
            r.read_bit()?; // separate_colour_plane_flag
        }
        r.read_ue()?; // bit_depth_luma_minus8
        r.read_ue()?; // bit_depth_chroma_minus8
        r.read_bit()?; // qpprime_y_zero_transform_bypass_flag
        if r.read_bit()? == 1 {
            let count = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..count {
                if r.read_bit()? == 1 {
                    let size = if i < 6 { 16 } else { 64 };
                    skip_scaling_list(&mut r, size)?;
                }
            }
        }
    }
    r.read_ue()?; // log2_max_frame_num_minus4
    let pic_order_cnt_type = r.read_ue()?;
    if pic_order_cnt_type == 0 {
        r.read_ue()?; // log2_max_pic_order_cnt_lsb_minus4
    } else if pic_order_cnt_type == 1 {
        r.read_bit()?; // delta_pic_order_always_zero_flag
        r.read_se()?; // offset_for_non_ref_pic
        r.read_se()?; // offset_for_top_to_bottom_field
        let num_ref = r.read_ue()?;
        for _ in 0..num_ref {
            r.read_se()?; // offset_for_ref_frame[i]
        }
    }
    r.read_ue()?; // max_num_ref_frames
    r.read_bit()?; // gaps_in_frame_num_value_allowed_flag
    let pic_width_in_mbs_minus1 = r.read_ue()?;
    let pic_height_in_map_units_minus1 = r.read_ue()?;
    let frame_mbs_only_flag = r.read_bit()? as u32;
    if frame_mbs_only_flag == 0 {
        r.read_bit()?; // mb_adaptive_frame_field_flag
    }
    r.read_bit()?; // direct_8x8_inference_flag
    let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0u32, 0u32, 0u32, 0u32);
    if r.read_bit()? == 1 {
        crop_left = r.read_ue()?;
        crop_right = r.read_ue()?;
        crop_top = r.read_ue()?;
        crop_bottom = r.read_ue()?;
    }

    let (sub_width_c, sub_height_c) = chroma_subsampling(chroma_format_idc);
    let crop_unit_x = if chroma_format_idc == 0 { 1 } else { sub_width_c };
    let crop_unit_y = if chroma_format_idc == 0 {
        2 - frame_mbs_only_flag
    } else {
        sub_height_c * (2 - frame_mbs_only_flag)
    };

    let width = (pic_width_in_mbs_minus1 + 1) * 16 - crop_unit_x * (crop_left + crop_right);
    let height =
        (2 - frame_mbs_only_flag) * (pic_height_in_map_units_minus1 + 1) * 16 - crop_unit_y * (crop_top + crop_bottom);

    Some(VideoGeometry {
        codec: format!("avc1.{:02x}{:02x}{:02x}", profile_idc, constraint_flags, level_idc),
        width: width.min(u16::MAX as u32) as u16,
        height: height.min(u16::MAX as u32) as u16,
        profile_idc,
        level_idc,
        constraint_flags,
    })
}

fn chroma_subsampling(chroma_format_idc: u32) -> (u32, u32) {
    match chroma_format_idc {
        1 => (2, 2),
        2 => (2, 1),
        3 => (1, 1),
        _ => (1, 1),
    }
}

/// Skips one `scaling_list` (ITU-T H.264 §7.3.2.1.1.1) without retaining
/// its values -- only its bit length matters for locating later fields.
fn skip_scaling_list(r: &mut BitReader, size: usize) -> Option<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = r.read_se()?;
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }
    Some(())
}

/// Fields pulled out of an H.265 SPS: everything `BuildHEVCDecoderConfig`
/// needs plus geometry. `chroma_format_idc` and the frame dimensions are
/// read from the Exp-Golomb tail of the SPS rather than assumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HevcSpsInfo {
    pub general_profile_space: u8,
    pub general_tier_flag: u8,
    pub general_profile_idc: u8,
    pub general_profile_compatibility_flags: u32,
    pub general_constraint_indicator_flags: u64, // low 48 bits significant
    pub general_level_idc: u8,
    pub chroma_format_idc: u8,
    pub width: u16,
    pub height: u16,
}

/// Parses an HEVC SPS NAL unit (payload starting at the 2-byte NAL
/// header): the `profile_tier_level` fields (ITU-T H.265 §7.3.3) plus the
/// `chroma_format_idc` and frame-size fields that follow it (§7.3.2.2.1).
/// Walks the sub-layer profile/level presence bits rather than assuming
/// `sps_max_sub_layers_minus1 == 0`, so streams with temporal sub-layering
/// still land on the right bit offset for the fields after it.
pub fn parse_h265_sps(sps: &[u8]) -> Option<HevcSpsInfo> {
    if sps.len() < 3 {
        return None;
    }
    let rbsp = strip_emulation_prevention(&sps[2..]);
    let mut r = BitReader::new(&rbsp);

    r.read_bits(4)?; // sps_video_parameter_set_id
    let max_sub_layers_minus1 = r.read_bits(3)? as u32;
    r.read_bit()?; // sps_temporal_id_nesting_flag

    let general_profile_space = r.read_bits(2)? as u8;
    let general_tier_flag = r.read_bits(1)? as u8;
    let general_profile_idc = r.read_bits(5)? as u8;
    let general_profile_compatibility_flags = r.read_bits(32)? as u32;
    let general_constraint_indicator_flags = r.read_bits(48)?;
    let general_level_idc = r.read_bits(8)? as u8;

    let mut sub_layer_profile_present = [false; 8];
    let mut sub_layer_level_present = [false; 8];
    for flags in sub_layer_profile_present
        .iter_mut()
        .zip(sub_layer_level_present.iter_mut())
        .take(max_sub_layers_minus1 as usize)
    {
        *flags.0 = r.read_bit()? == 1;
        *flags.1 = r.read_bit()? == 1;
    }
    if max_sub_layers_minus1 > 0 {
        for _ in max_sub_layers_minus1 as usize..8 {
            r.read_bits(2)?; // reserved_zero_2bits
        }
    }
    for i in 0..max_sub_layers_minus1 as usize {
        if sub_layer_profile_present[i] {
            r.read_bits(40)?; // space(2)+tier(1)+idc(5)+compatibility(32)
            r.read_bits(48)?; // constraint indicator flags
        }
        if sub_layer_level_present[i] {
            r.read_bits(8)?; // sub_layer_level_idc
        }
    }

    r.read_ue()?; // sps_seq_parameter_set_id
    let chroma_format_idc = r.read_ue()?;
    if chroma_format_idc == 3 {
        r.read_bit()?; // separate_colour_plane_flag
    }
    let pic_width_in_luma_samples = r.read_ue()?;
    let pic_height_in_luma_samples = r.read_ue()?;
    let (mut left, mut right, mut top, mut bottom) = (0u32, 0u32, 0u32, 0u32);
    if r.read_bit()? == 1 {
        left = r.read_ue()?;
        right = r.read_ue()?;
        top = r.read_ue()?;
        bottom = r.read_ue()?;
    }

    let (sub_width_c, sub_height_c) = chroma_subsampling(chroma_format_idc);
    let width = pic_width_in_luma_samples.saturating_sub(sub_width_c * (left + right));
    let height = pic_height_in_luma_samples.saturating_sub(sub_height_c * (top + bottom));

    Some(HevcSpsInfo {
        general_profile_space,
        general_tier_flag,
        general_profile_idc,
        general_profile_compatibility_flags,
        general_constraint_indicator_flags,
        general_level_idc,
        chroma_format_idc: (chroma_format_idc & 0x03) as u8,
        width: width.min(u16::MAX as u32) as u16,
        height: height.min(u16::MAX as u32) as u16,
    })
}

/// Builds an HEVCDecoderConfigurationRecord (ISO/IEC 14496-15 §8.3.3.1.2)
/// from the in-band VPS/SPS/PPS. Returns `None` if any input is empty or
/// the SPS is too short to parse.
pub fn build_hevc_decoder_config(vps: &[u8], sps: &[u8], pps: &[u8]) -> Option<Bytes> {
    if vps.is_empty() || sps.is_empty() || pps.is_empty() || sps.len() < 4 {
        return None;
    }
    let info = parse_h265_sps(sps)?;

    let mut out = BytesMut::with_capacity(23 + 5 + vps.len() + 5 + sps.len() + 5 + pps.len());
    out.put_u8(0x01); // configurationVersion
    out.put_u8((info.general_tier_flag << 5) | info.general_profile_idc); // general_profile_space is 0 in practice; folded per spec layout
    out.put_u32(info.general_profile_compatibility_flags);
    // 48-bit constraint indicator flags, MSB first.
    let constraint_bytes = info.general_constraint_indicator_flags.to_be_bytes();
    out.put_slice(&constraint_bytes[2..8]);
    out.put_u8(info.general_level_idc);
    out.put_u16(0xF000); // min_spatial_segmentation_idc=0, reserved=0xF
    out.put_u8(0xFC); // parallelismType=0, reserved=0xFC
    let chroma_byte = 0xFC | (info.chroma_format_idc & 0x03);
    out.put_u8(chroma_byte); // reserved(6) | chromaFormatIdc
    out.put_u8(0xF8); // bitDepthLumaMinus8=0, reserved=0xF8
    out.put_u8(0xF8); // bitDepthChromaMinus8=0, reserved=0xF8
    out.put_u16(0x0000); // avgFrameRate
    out.put_u8(0x0F); // constantFrameRate=0 | numTemporalLayers=1 | temporalIdNested=1 | lengthSizeMinusOne=3
    out.put_u8(0x03); // numOfArrays

    for (nal_type, data) in [(32u8, vps), (33u8, sps), (34u8, pps)] {
        out.put_u8(nal_type);
        out.put_u8(0x00);
        out.put_u8(0x01); // numNalus=1
        out.put_u16(data.len() as u16);
        out.put_slice(data);
    }

    Some(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_nalu_avc1() {
        let nalu: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x65, 0xAA, 0xBB];
        let out = annex_b_to_avc1([nalu]);
        assert_eq!(&out[..], &[0x00, 0x00, 0x00, 0x03, 0x65, 0xAA, 0xBB][..]);
    }

    #[test]
    fn multi_nalu_avc1() {
        let sps: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xE0];
        let pps: &[u8] = &[0x00, 0x00, 0x01, 0x68, 0xCE];
        let idr: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x80, 0x40];
        let out = annex_b_to_avc1([sps, pps, idr]);
        assert_eq!(out.len(), 21);
        assert_eq!(&out[0..4], &[0, 0, 0, 3]);
        assert_eq!(&out[7..11], &[0, 0, 0, 2]);
        assert_eq!(&out[13..17], &[0, 0, 0, 4]);
    }

    #[test]
    fn annex_b_to_avc1_empty_input() {
        let empty: Vec<&[u8]> = vec![];
        assert!(annex_b_to_avc1(empty).is_empty());
    }

    #[test]
    fn strip_adts_7_byte_header() {
        let data = [0xFF, 0xF1, 0x50, 0x80, 0x02, 0x00, 0xFC, 0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(&strip_adts(&data)[..], &[0xDE, 0xAD, 0xBE, 0xEF][..]);
    }

    #[test]
    fn strip_adts_9_byte_header_with_crc() {
        let mut data = vec![0xFF, 0xF0, 0x50, 0x80, 0x02, 0x00, 0xFC, 0x00, 0x00];
        data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&strip_adts(&data)[..], &[0xDE, 0xAD, 0xBE, 0xEF][..]);
    }

    #[test]
    fn strip_adts_non_adts_passthrough() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE];
        assert_eq!(&strip_adts(&data)[..], &data[..]);
    }

    #[test]
    fn strip_adts_idempotent() {
        let data = [0xFF, 0xF1, 0x50, 0x80, 0x02, 0x00, 0xFC, 0xDE, 0xAD, 0xBE, 0xEF];
        let once = strip_adts(&data);
        let twice = strip_adts(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn avc_decoder_config_layout() {
        let sps = [0x67, 0x42, 0xE0, 0x1E, 0xAB, 0xCD];
        let pps = [0x68, 0xCE, 0x38, 0x80];
        let out = build_avc_decoder_config(&sps, &pps).unwrap();
        let expected = [
            0x01, 0x42, 0xE0, 0x1E, 0xFF, 0xE1, 0x00, 0x06, 0x67, 0x42, 0xE0, 0x1E, 0xAB, 0xCD,
            0x01, 0x00, 0x04, 0x68, 0xCE, 0x38, 0x80,
        ];
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn avc_decoder_config_rejects_short_sps() {
        assert!(build_avc_decoder_config(&[0x67, 0x42, 0xE0], &[0x68]).is_none());
    }

    #[test]
    fn avc_decoder_config_rejects_empty_pps() {
        assert!(build_avc_decoder_config(&[0x67, 0x42, 0xE0, 0x1E], &[]).is_none());
    }

    /// Builds Exp-Golomb/fixed-width bitstreams for SPS test fixtures,
    /// byte-aligning (with zero padding) on `finish`.
    struct TestBitWriter {
        bytes: Vec<u8>,
        cur: u8,
        nbits: u8,
    }

    impl TestBitWriter {
        fn new() -> Self {
            TestBitWriter { bytes: Vec::new(), cur: 0, nbits: 0 }
        }

        fn push_bit(&mut self, bit: u8) {
            self.cur = (self.cur << 1) | (bit & 1);
            self.nbits += 1;
            if self.nbits == 8 {
                self.bytes.push(self.cur);
                self.cur = 0;
                self.nbits = 0;
            }
        }

        fn push_bits(&mut self, value: u64, n: u32) {
            for i in (0..n).rev() {
                self.push_bit(((value >> i) & 1) as u8);
            }
        }

        fn push_ue(&mut self, v: u32) {
            let code = v + 1;
            let width = 32 - code.leading_zeros();
            for _ in 0..width - 1 {
                self.push_bit(0);
            }
            self.push_bits(code as u64, width);
        }

        fn finish(mut self) -> Vec<u8> {
            while self.nbits != 0 {
                self.push_bit(0);
            }
            self.bytes
        }
    }

    /// Fixed profile_tier_level bytes matching the spec's level-IDC=93
    /// test vector, followed by Exp-Golomb-encoded `sps_seq_parameter_set_id`,
    /// `chroma_format_idc`, frame size and conformance-window fields.
    fn hevc_sps_fixture(chroma_format_idc: u32, width: u32, height: u32, crop: (u32, u32, u32, u32)) -> Vec<u8> {
        let mut sps = vec![
            0x42, 0x01, // NAL header (type 33 << 1)
            0x01,       // sps_video_parameter_set_id/max_sub_layers_minus1=0/nesting
            0x20,       // general_profile_space=0, tier=1, profile_idc=0
            0x00, 0x00, 0x00, 0x00, // profile_compatibility_flags
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // constraint flags
            93,         // general_level_idc
        ];
        let mut w = TestBitWriter::new();
        w.push_ue(0); // sps_seq_parameter_set_id
        w.push_ue(chroma_format_idc);
        w.push_ue(width);
        w.push_ue(height);
        let (left, right, top, bottom) = crop;
        if left == 0 && right == 0 && top == 0 && bottom == 0 {
            w.push_bit(0); // conformance_window_flag
        } else {
            w.push_bit(1);
            w.push_ue(left);
            w.push_ue(right);
            w.push_ue(top);
            w.push_ue(bottom);
        }
        sps.extend(w.finish());
        sps
    }

    #[test]
    fn hevc_decoder_config_layout() {
        let sps = hevc_sps_fixture(1, 0, 0, (0, 0, 0, 0));
        let vps = [0x40, 0x01, 0x0C];
        let pps = [0x44, 0x01];
        let out = build_hevc_decoder_config(&vps, &sps, &pps).unwrap();
        assert_eq!(out[0], 0x01);
        assert_eq!(out[12], 93);
        assert_eq!(out[16], 0xFD);
        assert_eq!(out[22], 0x03);
        assert_eq!(out[23], 0x20);
        let sps_start = 23 + 5 + vps.len();
        assert_eq!(out[sps_start], 0x21);
        let pps_start = sps_start + 5 + sps.len();
        assert_eq!(out[pps_start], 0x22);
        assert_eq!(out.len(), 23 + 5 + vps.len() + 5 + sps.len() + 5 + pps.len());
    }

    #[test]
    fn hevc_decoder_config_rejects_empty_inputs() {
        assert!(build_hevc_decoder_config(&[], &[0u8; 14], &[0x44]).is_none());
        assert!(build_hevc_decoder_config(&[0x40], &[0u8; 14], &[]).is_none());
    }

    #[test]
    fn parse_h265_sps_derives_chroma_and_geometry() {
        let sps = hevc_sps_fixture(1, 64, 64, (0, 1, 0, 1));
        let info = parse_h265_sps(&sps).unwrap();
        assert_eq!(info.chroma_format_idc, 1);
        assert_eq!(info.general_level_idc, 93);
        // 4:2:0: SubWidthC=SubHeightC=2, cropping removes 2*(left+right)/2*(top+bottom).
        assert_eq!(info.width, 62);
        assert_eq!(info.height, 62);
    }

    #[test]
    fn parse_h265_sps_422_chroma_round_trips() {
        let sps = hevc_sps_fixture(2, 32, 16, (0, 0, 0, 0));
        let info = parse_h265_sps(&sps).unwrap();
        assert_eq!(info.chroma_format_idc, 2);
        assert_eq!(info.width, 32);
        assert_eq!(info.height, 16);
    }

    #[test]
    fn parse_h265_sps_rejects_truncated_input() {
        assert!(parse_h265_sps(&[0x42, 0x01]).is_none());
    }

    /// Baseline-profile H.264 SPS (no high-profile chroma/scaling-list
    /// block): `profile_idc=66` takes the narrower syntax path.
    fn h264_sps_fixture(width_mbs: u32, height_map_units: u32, crop: (u32, u32, u32, u32)) -> Vec<u8> {
        let mut sps = vec![0x67, 66, 0x00, 30]; // NAL header, profile_idc, constraint_flags, level_idc
        let mut w = TestBitWriter::new();
        w.push_ue(0); // seq_parameter_set_id
        w.push_ue(0); // log2_max_frame_num_minus4
        w.push_ue(0); // pic_order_cnt_type=0
        w.push_ue(0); // log2_max_pic_order_cnt_lsb_minus4
        w.push_ue(1); // max_num_ref_frames
        w.push_bit(0); // gaps_in_frame_num_value_allowed_flag
        w.push_ue(width_mbs - 1);
        w.push_ue(height_map_units - 1);
        w.push_bit(1); // frame_mbs_only_flag
        w.push_bit(1); // direct_8x8_inference_flag
        let (left, right, top, bottom) = crop;
        if left == 0 && right == 0 && top == 0 && bottom == 0 {
            w.push_bit(0); // frame_cropping_flag
        } else {
            w.push_bit(1);
            w.push_ue(left);
            w.push_ue(right);
            w.push_ue(top);
            w.push_ue(bottom);
        }
        sps.extend(w.finish());
        sps
    }

    #[test]
    fn parse_h264_sps_derives_geometry_and_codec() {
        let sps = h264_sps_fixture(80, 45, (0, 0, 0, 0));
        let geometry = parse_h264_sps(&sps).unwrap();
        assert_eq!(geometry.width, 1280);
        assert_eq!(geometry.height, 720);
        assert_eq!(geometry.codec, "avc1.42001e");
        assert_eq!(geometry.profile_idc, 66);
        assert_eq!(geometry.level_idc, 30);
    }

    #[test]
    fn parse_h264_sps_applies_cropping() {
        // 4:2:0 baseline profile, cropping one chroma unit off the right and bottom edges.
        let sps = h264_sps_fixture(5, 3, (0, 1, 0, 1));
        let geometry = parse_h264_sps(&sps).unwrap();
        assert_eq!(geometry.width, 5 * 16 - 2);
        assert_eq!(geometry.height, 3 * 16 - 2);
    }

    #[test]
    fn parse_h264_sps_rejects_truncated_input() {
        assert!(parse_h264_sps(&[0x67, 0x42]).is_none());
    }
}
