// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Duplex demultiplexing for devices that send both sides in one stream.
//
// The splitter keeps no per-side state beyond a carry of bytes that do not
// yet form a whole unit, so reads may end anywhere.

use scanwerk_core::types::{DuplexInterlace, Side};

/// Decides which side the next whole line of a raster-offset stream belongs
/// to. The front leads by `lag` lines; the back finishes `lag` lines after
/// the front; in between the sides alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRouter {
    lag: usize,
    height: usize,
    counts: [usize; 2],
}

impl LineRouter {
    pub fn new(lag: usize, height: usize) -> Self {
        Self {
            lag: lag.min(height),
            height,
            counts: [0; 2],
        }
    }

    pub fn next_side(&mut self) -> Side {
        let [front, back] = self.counts;
        let side = if front < self.lag {
            Side::Front
        } else if front >= self.height {
            Side::Back
        } else if front - self.lag == back {
            Side::Front
        } else {
            Side::Back
        };
        self.counts[side.index()] += 1;
        side
    }

    /// Lines routed so far, per side.
    pub fn counts(&self) -> [usize; 2] {
        self.counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Split {
    Lines,
    Bytes,
    ThreeHead,
    Routed(LineRouter),
}

/// Splits an interleaved duplex stream into per-side raw streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplexSplitter {
    split: Split,
    /// Bytes per line of one side.
    bpl: usize,
    carry: Vec<u8>,
}

impl DuplexSplitter {
    /// Splitter for `interlace`, or `None` when the sides are read apart.
    /// `lag` and `height` only matter for raster-offset streams.
    pub fn new(interlace: DuplexInterlace, bpl: usize, lag: usize, height: usize) -> Option<Self> {
        let split = match interlace {
            DuplexInterlace::None => return None,
            DuplexInterlace::LineAlternate => Split::Lines,
            DuplexInterlace::ByteAlternate => Split::Bytes,
            DuplexInterlace::ThreeHead => Split::ThreeHead,
            DuplexInterlace::RasterOffset => Split::Routed(LineRouter::new(lag, height)),
        };
        Some(Self {
            split,
            bpl: bpl.max(1),
            carry: Vec::new(),
        })
    }

    /// Bytes that make up one indivisible group of the stream.
    pub fn unit(&self) -> usize {
        match self.split {
            Split::Lines => 2 * self.bpl,
            Split::Bytes => 2,
            Split::ThreeHead => 6,
            Split::Routed(_) => self.bpl,
        }
    }

    /// Bytes held back waiting for the rest of their unit.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Append the front and back parts of `input` to `front` and `back`.
    pub fn split(&mut self, input: &[u8], front: &mut Vec<u8>, back: &mut Vec<u8>) {
        let unit = self.unit();
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(input);
        let whole = data.len() - data.len() % unit;

        for group in data[..whole].chunks_exact(unit) {
            match &mut self.split {
                Split::Lines => {
                    front.extend_from_slice(&group[..self.bpl]);
                    back.extend_from_slice(&group[self.bpl..]);
                }
                Split::Bytes => {
                    front.push(group[0]);
                    back.push(group[1]);
                }
                // partial descramble; the per-side line transform does the rest
                Split::ThreeHead => {
                    front.extend_from_slice(&[group[2], group[4], group[5]]);
                    back.extend_from_slice(&[group[3], group[0], group[1]]);
                }
                Split::Routed(router) => match router.next_side() {
                    Side::Front => front.extend_from_slice(group),
                    Side::Back => back.extend_from_slice(group),
                },
            }
        }
        data.drain(..whole);
        self.carry = data;
    }
}

/// Build the single stream a device would send for two sides of raw lines.
/// Inverse of [`DuplexSplitter::split`].
pub fn interleave(
    interlace: DuplexInterlace,
    bpl: usize,
    lag: usize,
    front: &[u8],
    back: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(front.len() + back.len());
    match interlace {
        DuplexInterlace::None => {
            out.extend_from_slice(front);
            out.extend_from_slice(back);
        }
        DuplexInterlace::LineAlternate => {
            for (f, b) in front.chunks(bpl).zip(back.chunks(bpl)) {
                out.extend_from_slice(f);
                out.extend_from_slice(b);
            }
        }
        DuplexInterlace::ByteAlternate => {
            for (f, b) in front.iter().zip(back) {
                out.push(*f);
                out.push(*b);
            }
        }
        DuplexInterlace::ThreeHead => {
            for (f, b) in front.chunks_exact(3).zip(back.chunks_exact(3)) {
                out.extend_from_slice(&[b[1], b[2], f[0], b[0], f[1], f[2]]);
            }
        }
        DuplexInterlace::RasterOffset => {
            let height = front.len() / bpl.max(1);
            let mut router = LineRouter::new(lag, height);
            let mut next = [0usize; 2];
            for _ in 0..2 * height {
                let side = router.next_side();
                let src = if side == Side::Front { front } else { back };
                let at = next[side.index()] * bpl;
                out.extend_from_slice(&src[at..at + bpl]);
                next[side.index()] += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(s: &mut DuplexSplitter, input: &[u8], chunk: usize) -> (Vec<u8>, Vec<u8>) {
        let (mut f, mut b) = (Vec::new(), Vec::new());
        for c in input.chunks(chunk) {
            s.split(c, &mut f, &mut b);
        }
        (f, b)
    }

    #[test]
    fn router_leads_then_alternates_then_trails() {
        let mut r = LineRouter::new(2, 4);
        let order: Vec<Side> = (0..8).map(|_| r.next_side()).collect();
        use Side::{Back as B, Front as F};
        assert_eq!(order, vec![F, F, F, B, F, B, B, B]);
        assert_eq!(r.counts(), [4, 4]);
    }

    #[test]
    fn byte_alternate_survives_odd_chunks() {
        let mut s = DuplexSplitter::new(DuplexInterlace::ByteAlternate, 4, 0, 0).expect("split");
        let (f, b) = split_all(&mut s, &[1, 2, 3, 4, 5, 6, 7], 3);
        assert_eq!(f, vec![1, 3, 5]);
        assert_eq!(b, vec![2, 4, 6]);
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn line_alternate_keeps_whole_lines() {
        let mut s = DuplexSplitter::new(DuplexInterlace::LineAlternate, 2, 0, 0).expect("split");
        let (f, b) = split_all(&mut s, &[1, 1, 2, 2, 3, 3, 4, 4], 5);
        assert_eq!(f, vec![1, 1, 3, 3]);
        assert_eq!(b, vec![2, 2, 4, 4]);
    }

    #[test]
    fn three_head_groups_pick_bytes() {
        let mut s = DuplexSplitter::new(DuplexInterlace::ThreeHead, 3, 0, 0).expect("split");
        let (f, b) = split_all(&mut s, &[0, 1, 2, 3, 4, 5], 6);
        assert_eq!(f, vec![2, 4, 5]);
        assert_eq!(b, vec![3, 0, 1]);
    }

    #[test]
    fn separate_reads_need_no_splitter() {
        assert!(DuplexSplitter::new(DuplexInterlace::None, 4, 0, 0).is_none());
    }

    #[test]
    fn routed_stream_reassembles() {
        let front: Vec<u8> = (0..10).collect();
        let back: Vec<u8> = (100..110).collect();
        let stream = interleave(DuplexInterlace::RasterOffset, 2, 1, &front, &back);
        assert_eq!(&stream[..4], &[0, 1, 2, 3]);
        let mut s = DuplexSplitter::new(DuplexInterlace::RasterOffset, 2, 1, 5).expect("split");
        let (f, b) = split_all(&mut s, &stream, 3);
        assert_eq!(f, front);
        assert_eq!(b, back);
    }
}
