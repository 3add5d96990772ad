//! Static coarse per-country positions
//!
//! Used when a record carries only a country code, or when a geolocation
//! block has no parseable coordinates.

use crate::annotation::Position;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static COARSE_POSITIONS: Lazy<HashMap<&'static str, Position>> = Lazy::new(|| {
    [
        ("AL", Position::new(41.0, 20.0)),
        ("DZ", Position::new(28.0, 3.0)),
        ("AS", Position::new(-14.3333, -170.0)),
        ("AD", Position::new(42.5, 1.6)),
        ("AO", Position::new(-12.5, 18.5)),
        ("AI", Position::new(18.25, -63.1667)),
        ("AQ", Position::new(-90.0, 0.0)),
        ("AG", Position::new(17.05, -61.8)),
        ("AR", Position::new(-34.0, -64.0)),
        ("AM", Position::new(40.0, 45.0)),
        ("AW", Position::new(12.5, -69.9667)),
        ("AU", Position::new(-27.0, 133.0)),
        ("AT", Position::new(47.3333, 13.3333)),
        ("AZ", Position::new(40.5, 47.5)),
        ("BS", Position::new(24.25, -76.0)),
        ("BH", Position::new(26.0, 50.55)),
        ("BD", Position::new(24.0, 90.0)),
        ("BB", Position::new(13.1667, -59.5333)),
        ("BY", Position::new(53.0, 28.0)),
        ("BE", Position::new(50.8333, 4.0)),
        ("BZ", Position::new(17.25, -88.75)),
        ("BJ", Position::new(9.5, 2.25)),
        ("BM", Position::new(32.3333, -64.75)),
        ("BT", Position::new(27.5, 90.5)),
        ("BO", Position::new(-17.0, -65.0)),
        ("BA", Position::new(44.0, 18.0)),
        ("BW", Position::new(-22.0, 24.0)),
        ("BV", Position::new(-54.4333, 3.4)),
        ("BR", Position::new(-10.0, -55.0)),
        ("IO", Position::new(-6.0, 71.5)),
        ("BN", Position::new(4.5, 114.6667)),
        ("BG", Position::new(43.0, 25.0)),
        ("BF", Position::new(13.0, -2.0)),
        ("BI", Position::new(-3.5, 30.0)),
        ("KH", Position::new(13.0, 105.0)),
        ("CM", Position::new(6.0, 12.0)),
        ("CA", Position::new(60.0, -95.0)),
        ("CV", Position::new(16.0, -24.0)),
        ("KY", Position::new(19.5, -80.5)),
        ("CF", Position::new(7.0, 21.0)),
        ("TD", Position::new(15.0, 19.0)),
        ("CL", Position::new(-30.0, -71.0)),
        ("CN", Position::new(35.0, 105.0)),
        ("CX", Position::new(-10.5, 105.6667)),
        ("CC", Position::new(-12.5, 96.8333)),
        ("CO", Position::new(4.0, -72.0)),
        ("KM", Position::new(-12.1667, 44.25)),
        ("CG", Position::new(-1.0, 15.0)),
        ("CD", Position::new(0.0, 25.0)),
        ("CK", Position::new(-21.2333, -159.7667)),
        ("CR", Position::new(10.0, -84.0)),
        ("CI", Position::new(8.0, -5.0)),
        ("HR", Position::new(45.1667, 15.5)),
        ("CU", Position::new(21.5, -80.0)),
        ("CY", Position::new(35.0, 33.0)),
        ("CZ", Position::new(49.75, 15.5)),
        ("DK", Position::new(56.0, 10.0)),
        ("DJ", Position::new(11.5, 43.0)),
        ("DM", Position::new(15.4167, -61.3333)),
        ("DO", Position::new(19.0, -70.6667)),
        ("EC", Position::new(-2.0, -77.5)),
        ("EG", Position::new(27.0, 30.0)),
        ("SV", Position::new(13.8333, -88.9167)),
        ("GQ", Position::new(2.0, 10.0)),
        ("ER", Position::new(15.0, 39.0)),
        ("EE", Position::new(59.0, 26.0)),
        ("ET", Position::new(8.0, 38.0)),
        ("FK", Position::new(-51.75, -59.0)),
        ("FO", Position::new(62.0, -7.0)),
        ("FJ", Position::new(-18.0, 175.0)),
        ("FI", Position::new(64.0, 26.0)),
        ("FR", Position::new(46.0, 2.0)),
        ("GF", Position::new(4.0, -53.0)),
        ("PF", Position::new(-15.0, -140.0)),
        ("TF", Position::new(-43.0, 67.0)),
        ("GA", Position::new(-1.0, 11.75)),
        ("GM", Position::new(13.4667, -16.5667)),
        ("GE", Position::new(42.0, 43.5)),
        ("DE", Position::new(51.0, 9.0)),
        ("GH", Position::new(8.0, -2.0)),
        ("GI", Position::new(36.1833, -5.3667)),
        ("GR", Position::new(39.0, 22.0)),
        ("GL", Position::new(72.0, -40.0)),
        ("GD", Position::new(12.1167, -61.6667)),
        ("GP", Position::new(16.25, -61.5833)),
        ("GU", Position::new(13.4667, 144.7833)),
        ("GT", Position::new(15.5, -90.25)),
        ("GG", Position::new(49.5, -2.56)),
        ("GN", Position::new(11.0, -10.0)),
        ("GW", Position::new(12.0, -15.0)),
        ("GY", Position::new(5.0, -59.0)),
        ("HT", Position::new(19.0, -72.4167)),
        ("HM", Position::new(-53.1, 72.5167)),
        ("VA", Position::new(41.9, 12.45)),
        ("HN", Position::new(15.0, -86.5)),
        ("HK", Position::new(22.25, 114.1667)),
        ("HU", Position::new(47.0, 20.0)),
        ("IS", Position::new(65.0, -18.0)),
        ("IN", Position::new(20.0, 77.0)),
        ("ID", Position::new(-5.0, 120.0)),
        ("IR", Position::new(32.0, 53.0)),
        ("IQ", Position::new(33.0, 44.0)),
        ("IE", Position::new(53.0, -8.0)),
        ("IM", Position::new(54.23, -4.55)),
        ("IL", Position::new(31.5, 34.75)),
        ("IT", Position::new(42.8333, 12.8333)),
        ("JM", Position::new(18.25, -77.5)),
        ("JP", Position::new(36.0, 138.0)),
        ("JE", Position::new(49.21, -2.13)),
        ("JO", Position::new(31.0, 36.0)),
        ("KZ", Position::new(48.0, 68.0)),
        ("KE", Position::new(1.0, 38.0)),
        ("KI", Position::new(1.4167, 173.0)),
        ("KP", Position::new(40.0, 127.0)),
        ("KR", Position::new(37.0, 127.5)),
        ("KW", Position::new(29.3375, 47.6581)),
        ("KG", Position::new(41.0, 75.0)),
        ("LA", Position::new(18.0, 105.0)),
        ("LV", Position::new(57.0, 25.0)),
        ("LB", Position::new(33.8333, 35.8333)),
        ("LS", Position::new(-29.5, 28.5)),
        ("LR", Position::new(6.5, -9.5)),
        ("LY", Position::new(25.0, 17.0)),
        ("LI", Position::new(47.1667, 9.5333)),
        ("LT", Position::new(56.0, 24.0)),
        ("LU", Position::new(49.75, 6.1667)),
        ("MO", Position::new(22.1667, 113.55)),
        ("MK", Position::new(41.8333, 22.0)),
        ("MG", Position::new(-20.0, 47.0)),
        ("MW", Position::new(-13.5, 34.0)),
        ("MY", Position::new(2.5, 112.5)),
        ("MV", Position::new(3.25, 73.0)),
        ("ML", Position::new(17.0, -4.0)),
        ("MT", Position::new(35.8333, 14.5833)),
        ("MH", Position::new(9.0, 168.0)),
        ("MQ", Position::new(14.6667, -61.0)),
        ("MR", Position::new(20.0, -12.0)),
        ("MU", Position::new(-20.2833, 57.55)),
        ("YT", Position::new(-12.8333, 45.1667)),
        ("MX", Position::new(23.0, -102.0)),
        ("FM", Position::new(6.9167, 158.25)),
        ("MD", Position::new(47.0, 29.0)),
        ("MC", Position::new(43.7333, 7.4)),
        ("MN", Position::new(46.0, 105.0)),
        ("ME", Position::new(42.0, 19.0)),
        ("MS", Position::new(16.75, -62.2)),
        ("MA", Position::new(32.0, -5.0)),
        ("MZ", Position::new(-18.25, 35.0)),
        ("MM", Position::new(22.0, 98.0)),
        ("NA", Position::new(-22.0, 17.0)),
        ("NR", Position::new(-0.5333, 166.9167)),
        ("NP", Position::new(28.0, 84.0)),
        ("NL", Position::new(52.5, 5.75)),
        ("AN", Position::new(12.25, -68.75)),
        ("NC", Position::new(-21.5, 165.5)),
        ("NZ", Position::new(-41.0, 174.0)),
        ("NI", Position::new(13.0, -85.0)),
        ("NE", Position::new(16.0, 8.0)),
        ("NG", Position::new(10.0, 8.0)),
        ("NU", Position::new(-19.0333, -169.8667)),
        ("NF", Position::new(-29.0333, 167.95)),
        ("MP", Position::new(15.2, 145.75)),
        ("NO", Position::new(62.0, 10.0)),
        ("OM", Position::new(21.0, 57.0)),
        ("PK", Position::new(30.0, 70.0)),
        ("PW", Position::new(7.5, 134.5)),
        ("PS", Position::new(32.0, 35.25)),
        ("PA", Position::new(9.0, -80.0)),
        ("PG", Position::new(-6.0, 147.0)),
        ("PY", Position::new(-23.0, -58.0)),
        ("PE", Position::new(-10.0, -76.0)),
        ("PH", Position::new(13.0, 122.0)),
        ("PN", Position::new(-24.7, -127.4)),
        ("PL", Position::new(52.0, 20.0)),
        ("PT", Position::new(39.5, -8.0)),
        ("PR", Position::new(18.25, -66.5)),
        ("QA", Position::new(25.5, 51.25)),
        ("RE", Position::new(-21.1, 55.6)),
        ("RO", Position::new(46.0, 25.0)),
        ("RU", Position::new(60.0, 100.0)),
        ("RW", Position::new(-2.0, 30.0)),
        ("SH", Position::new(-15.9333, -5.7)),
        ("KN", Position::new(17.3333, -62.75)),
        ("LC", Position::new(13.8833, -61.1333)),
        ("PM", Position::new(46.8333, -56.3333)),
        ("VC", Position::new(13.25, -61.2)),
        ("WS", Position::new(-13.5833, -172.3333)),
        ("SM", Position::new(43.7667, 12.4167)),
        ("ST", Position::new(1.0, 7.0)),
        ("SA", Position::new(25.0, 45.0)),
        ("SN", Position::new(14.0, -14.0)),
        ("RS", Position::new(44.0, 21.0)),
        ("SC", Position::new(-4.5833, 55.6667)),
        ("SL", Position::new(8.5, -11.5)),
        ("SG", Position::new(1.3667, 103.8)),
        ("SK", Position::new(48.6667, 19.5)),
        ("SI", Position::new(46.0, 15.0)),
        ("SB", Position::new(-8.0, 159.0)),
        ("SO", Position::new(10.0, 49.0)),
        ("ZA", Position::new(-29.0, 24.0)),
        ("GS", Position::new(-54.5, -37.0)),
        ("ES", Position::new(40.0, -4.0)),
        ("LK", Position::new(7.0, 81.0)),
        ("SD", Position::new(15.0, 30.0)),
        ("SR", Position::new(4.0, -56.0)),
        ("SJ", Position::new(78.0, 20.0)),
        ("SZ", Position::new(-26.5, 31.5)),
        ("SE", Position::new(62.0, 15.0)),
        ("CH", Position::new(47.0, 8.0)),
        ("SY", Position::new(35.0, 38.0)),
        ("TW", Position::new(23.5, 121.0)),
        ("TJ", Position::new(39.0, 71.0)),
        ("TZ", Position::new(-6.0, 35.0)),
        ("TH", Position::new(15.0, 100.0)),
        ("TL", Position::new(-8.55, 125.5167)),
        ("TG", Position::new(8.0, 1.1667)),
        ("TK", Position::new(-9.0, -172.0)),
        ("TO", Position::new(-20.0, -175.0)),
        ("TT", Position::new(11.0, -61.0)),
        ("TN", Position::new(34.0, 9.0)),
        ("TR", Position::new(39.0, 35.0)),
        ("TM", Position::new(40.0, 60.0)),
        ("TC", Position::new(21.75, -71.5833)),
        ("TV", Position::new(-8.0, 178.0)),
        ("UG", Position::new(1.0, 32.0)),
        ("UA", Position::new(49.0, 32.0)),
        ("AE", Position::new(24.0, 54.0)),
        ("GB", Position::new(54.0, -2.0)),
        ("US", Position::new(38.0, -97.0)),
        ("UM", Position::new(19.2833, 166.6)),
        ("UY", Position::new(-33.0, -56.0)),
        ("UZ", Position::new(41.0, 64.0)),
        ("VU", Position::new(-16.0, 167.0)),
        ("VE", Position::new(8.0, -66.0)),
        ("VN", Position::new(16.0, 106.0)),
        ("VG", Position::new(18.5, -64.5)),
        ("VI", Position::new(18.3333, -64.8333)),
        ("WF", Position::new(-13.3, -176.2)),
        ("EH", Position::new(24.5, -13.0)),
        ("YE", Position::new(15.0, 48.0)),
        ("ZM", Position::new(-15.0, 30.0)),
        ("ZW", Position::new(-20.0, 30.0)),
        ("AF", Position::new(33.0, 65.0)),
        ("EU", Position::new(54.5260, 15.2551)),
        ("SS", Position::new(7.8627, 29.6949)),
        ("CW", Position::new(12.1696, 68.9900)),
        ("MF", Position::new(18.0826, 63.0523)),
        ("SX", Position::new(18.0425, 63.0548)),
        ("BQ", Position::new(12.1784, 68.2385)),
        ("AP", Position::new(34.0479, 100.6197)),
        ("AX", Position::new(60.1785, 19.9156)),
        ("BL", Position::new(17.9000, 62.8333)),
    ]
    .into_iter()
    .collect()
});

/// Coarse position of an ISO country code (or registry pseudo-code such as `EU`).
pub fn coarse_position(country: &str) -> Option<Position> {
    COARSE_POSITIONS.get(country).copied()
}
