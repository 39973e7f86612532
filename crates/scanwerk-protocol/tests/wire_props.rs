// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Property tests: command blocks decode to what was encoded, and status
// interpretation is a pure function of the sense block.

use proptest::prelude::*;

use scanwerk_protocol::command::{self, WindowDescriptor};
use scanwerk_protocol::status::{SenseData, StatusCache, interpret};

fn descriptor() -> impl Strategy<Value = WindowDescriptor> {
    (
        (any::<u8>(), any::<u16>(), any::<u16>(), any::<u32>(), any::<u32>()),
        (any::<u32>(), any::<u32>(), any::<u8>(), any::<u8>(), any::<u8>()),
        (any::<u8>(), any::<u8>(), any::<bool>(), 0u8..8, 0u8..8),
        (any::<u16>(), any::<u8>(), any::<u8>(), any::<u8>()),
    )
        .prop_map(
            |(
                (window_id, x_res, y_res, ulx, uly),
                (width, length, brightness, threshold, contrast),
                (composition, bits_per_pixel, rif, rgb, padding),
                (bit_order, compress_type, compress_arg, reserved),
            )| WindowDescriptor {
                window_id,
                x_res,
                y_res,
                ulx,
                uly,
                width,
                length,
                brightness,
                threshold,
                contrast,
                composition,
                bits_per_pixel,
                ht_type: 0,
                ht_pattern: 0,
                rif,
                rgb,
                padding,
                bit_order,
                compress_type,
                compress_arg,
                reserved,
            },
        )
}

proptest! {
    #[test]
    fn window_descriptor_round_trips(desc in descriptor()) {
        let cmd = command::set_window(&desc);
        let back = command::decode_set_window(&cmd.payload).expect("decode");
        prop_assert_eq!(back, desc);
    }

    #[test]
    fn read_block_round_trips(data_type in any::<u8>(), len in 0usize..0x0100_0000) {
        let cmd = command::read(data_type, len);
        prop_assert_eq!(command::decode_read(&cmd.cdb), (data_type, len));
    }

    #[test]
    fn interpretation_is_stable(
        key in 0u8..16,
        asc in any::<u8>(),
        ascq in any::<u8>(),
        eom in any::<bool>(),
        ili in any::<bool>(),
        information in any::<u32>(),
    ) {
        let sense = SenseData { key, asc, ascq, eom, ili, information };
        let block = sense.encode();
        let parsed = SenseData::parse(&block).expect("parse");
        prop_assert_eq!(parsed, sense);

        let mut cache = StatusCache::default();
        let first = cache.record(&parsed);
        let first_residual = cache.residual;
        let second = cache.record(&parsed);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_residual, cache.residual);
        prop_assert_eq!(first, interpret(&sense));
    }
}
