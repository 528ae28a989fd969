//! Low-precision built-in ephemeris.
//!
//! Planet positions come from mean Keplerian elements (J2000 values plus
//! linear rates per Julian century, valid 1800-2050). The Moon uses a single
//! equation-of-centre term. Accuracy is around a degree for the planets and a
//! couple of degrees for the Moon, which is plenty for picking out aspects.

use super::{AspectRecord, ChartError, ChartProvider, ChartReport};
use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;
use std::fmt::Write as _;

const SIGNS: [&str; 12] = [
    "Aries",
    "Taurus",
    "Gemini",
    "Cancer",
    "Leo",
    "Virgo",
    "Libra",
    "Scorpio",
    "Sagittarius",
    "Capricorn",
    "Aquarius",
    "Pisces",
];

/// Aspect kinds searched for, with their exact angle and allowed orb.
const ASPECTS: [(&str, f64, f64); 10] = [
    ("conjunction", 0.0, 10.0),
    ("semi-sextile", 30.0, 1.0),
    ("semi-square", 45.0, 1.0),
    ("sextile", 60.0, 6.0),
    ("quintile", 72.0, 1.0),
    ("square", 90.0, 5.0),
    ("trine", 120.0, 8.0),
    ("sesquiquadrate", 135.0, 1.0),
    ("quincunx", 150.0, 1.0),
    ("opposition", 180.0, 10.0),
];

/// Where the chart is cast.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            name: "Greenwich, London".to_string(),
            latitude: 51.4779,
            longitude: -0.0015,
        }
    }
}

/// Mean orbital elements: value at J2000 and rate per century.
struct Elements {
    name: &'static str,
    a: (f64, f64),
    e: (f64, f64),
    i: (f64, f64),
    l: (f64, f64),
    peri: (f64, f64),
    node: (f64, f64),
}

const EARTH: Elements = Elements {
    name: "Earth",
    a: (1.000_002_61, 0.000_005_62),
    e: (0.016_711_23, -0.000_043_92),
    i: (-0.000_015_31, -0.012_946_68),
    l: (100.464_571_66, 35_999.372_449_81),
    peri: (102.937_681_93, 0.323_273_64),
    node: (0.0, 0.0),
};

const PLANETS: [Elements; 8] = [
    Elements {
        name: "Mercury",
        a: (0.387_099_27, 0.000_000_37),
        e: (0.205_635_93, 0.000_019_06),
        i: (7.004_979_02, -0.005_947_49),
        l: (252.250_323_50, 149_472.674_111_75),
        peri: (77.457_796_28, 0.160_476_89),
        node: (48.330_765_93, -0.125_340_81),
    },
    Elements {
        name: "Venus",
        a: (0.723_335_66, 0.000_003_90),
        e: (0.006_776_72, -0.000_041_07),
        i: (3.394_676_05, -0.000_788_90),
        l: (181.979_099_50, 58_517.815_387_29),
        peri: (131.602_467_18, 0.002_683_29),
        node: (76.679_842_55, -0.277_694_18),
    },
    Elements {
        name: "Mars",
        a: (1.523_710_34, 0.000_018_47),
        e: (0.093_394_10, 0.000_078_82),
        i: (1.849_691_42, -0.008_131_31),
        l: (-4.553_432_05, 19_140.302_684_99),
        peri: (-23.943_629_59, 0.444_410_88),
        node: (49.559_538_91, -0.292_573_43),
    },
    Elements {
        name: "Jupiter",
        a: (5.202_887_00, -0.000_116_07),
        e: (0.048_386_24, -0.000_132_53),
        i: (1.304_396_95, -0.001_837_14),
        l: (34.396_440_51, 3_034.746_127_75),
        peri: (14.728_479_83, 0.212_526_68),
        node: (100.473_909_09, 0.204_691_06),
    },
    Elements {
        name: "Saturn",
        a: (9.536_675_94, -0.001_250_60),
        e: (0.053_861_79, -0.000_509_91),
        i: (2.485_991_87, 0.001_936_09),
        l: (49.954_244_23, 1_222.493_622_01),
        peri: (92.598_878_31, -0.418_972_16),
        node: (113.662_424_48, -0.288_677_94),
    },
    Elements {
        name: "Uranus",
        a: (19.189_164_64, -0.001_961_76),
        e: (0.047_257_44, -0.000_043_97),
        i: (0.772_637_83, -0.002_429_39),
        l: (313.238_104_51, 428.482_027_85),
        peri: (170.954_276_30, 0.408_052_81),
        node: (74.016_925_03, 0.042_405_89),
    },
    Elements {
        name: "Neptune",
        a: (30.069_922_76, 0.000_262_91),
        e: (0.008_590_48, 0.000_051_05),
        i: (1.770_043_47, 0.000_353_72),
        l: (-55.120_029_69, 218.459_453_25),
        peri: (44.964_762_27, -0.322_414_64),
        node: (131.784_225_74, -0.005_086_64),
    },
    Elements {
        name: "Pluto",
        a: (39.482_116_75, -0.000_315_96),
        e: (0.248_827_30, 0.000_051_70),
        i: (17.140_012_06, 0.000_048_18),
        l: (238.929_038_33, 145.207_805_15),
        peri: (224.068_916_29, -0.040_629_42),
        node: (110.303_936_84, -0.011_834_82),
    },
];

impl Elements {
    /// Heliocentric ecliptic position in AU at `t` Julian centuries from J2000.
    fn position(&self, t: f64) -> [f64; 3] {
        let at = |(v, rate): (f64, f64)| v + rate * t;

        let a = at(self.a);
        let e = at(self.e);
        let i = at(self.i).to_radians();
        let peri = at(self.peri);
        let node = at(self.node);
        let mean_anomaly = normalize(at(self.l) - peri).to_radians();
        let arg_peri = (peri - node).to_radians();
        let node = node.to_radians();

        let ecc_anomaly = solve_kepler(mean_anomaly, e);
        let xp = a * (ecc_anomaly.cos() - e);
        let yp = a * (1.0 - e * e).sqrt() * ecc_anomaly.sin();

        let (so, co) = arg_peri.sin_cos();
        let (sn, cn) = node.sin_cos();
        let (si, ci) = i.sin_cos();

        [
            (co * cn - so * sn * ci) * xp + (-so * cn - co * sn * ci) * yp,
            (co * sn + so * cn * ci) * xp + (-so * sn + co * cn * ci) * yp,
            (so * si) * xp + (co * si) * yp,
        ]
    }
}

/// Solve `M = E - e sin E` for `E` by Newton iteration.
fn solve_kepler(mean_anomaly: f64, e: f64) -> f64 {
    let mut ecc = if e < 0.8 { mean_anomaly } else { PI };
    for _ in 0..30 {
        let delta = (ecc - e * ecc.sin() - mean_anomaly) / (1.0 - e * ecc.cos());
        ecc -= delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    ecc
}

/// Wrap an angle in degrees into `[0, 360)`.
fn normalize(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Smallest angle between two longitudes, in `[0, 180]`.
fn separation(a: f64, b: f64) -> f64 {
    let d = normalize(a - b);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Format a longitude as degrees within its zodiac sign.
pub fn zodiac_position(longitude: f64) -> String {
    let lon = normalize(longitude);
    let sign = ((lon / 30.0) as usize).min(11);
    format!("{:.2}° {}", lon - sign as f64 * 30.0, SIGNS[sign])
}

/// A body and its geocentric ecliptic longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPosition {
    pub name: &'static str,
    pub longitude: f64,
}

/// Chart provider backed by the built-in mean-element ephemeris.
#[derive(Debug, Clone, Default)]
pub struct MeanElementEphemeris {
    location: Location,
}

impl MeanElementEphemeris {
    pub fn new(location: Location) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Geocentric longitudes of every charted body at 12:00 UTC on `date`.
    pub fn positions(&self, date: NaiveDate) -> Result<Vec<BodyPosition>, ChartError> {
        if !(1800..=2050).contains(&date.year()) {
            return Err(ChartError::InvalidDate(date));
        }

        let j2000 = NaiveDate::from_ymd_opt(2000, 1, 1).ok_or(ChartError::InvalidDate(date))?;
        let days = (date - j2000).num_days() as f64;
        let t = days / 36_525.0;

        let earth = EARTH.position(t);
        let geocentric = |p: [f64; 3]| {
            normalize((p[1] - earth[1]).atan2(p[0] - earth[0]).to_degrees())
        };

        let mut bodies = Vec::with_capacity(PLANETS.len() + 3);
        bodies.push(BodyPosition {
            name: "Sun",
            longitude: geocentric([0.0, 0.0, 0.0]),
        });

        let moon_mean = 218.316 + 13.176_396 * days;
        let moon_anomaly = (134.963 + 13.064_993 * days).to_radians();
        bodies.push(BodyPosition {
            name: "Moon",
            longitude: normalize(moon_mean + 6.289 * moon_anomaly.sin()),
        });

        for planet in &PLANETS {
            bodies.push(BodyPosition {
                name: planet.name,
                longitude: geocentric(planet.position(t)),
            });
        }

        bodies.push(BodyPosition {
            name: "Mean_Node",
            longitude: normalize(125.044_52 - 1_934.136_261 * t),
        });

        Ok(bodies)
    }
}

impl ChartProvider for MeanElementEphemeris {
    fn compute(&self, date: NaiveDate) -> Result<ChartReport, ChartError> {
        let bodies = self.positions(date)?;

        let mut header = String::new();
        let _ = writeln!(header, "Astrological chart for {date} (12:00 UTC)");
        let _ = writeln!(
            header,
            "Location: {} ({:.2}°{}, {:.2}°{})",
            self.location.name,
            self.location.latitude.abs(),
            if self.location.latitude >= 0.0 { "N" } else { "S" },
            self.location.longitude.abs(),
            if self.location.longitude >= 0.0 { "E" } else { "W" },
        );
        header.push_str("\nPositions:\n");
        for body in &bodies {
            let _ = writeln!(header, "{}: {}", body.name, zodiac_position(body.longitude));
        }

        let mut aspects = Vec::new();
        for (i, first) in bodies.iter().enumerate() {
            for second in &bodies[i + 1..] {
                let sep = separation(first.longitude, second.longitude);
                if let Some((kind, angle, _)) = ASPECTS
                    .iter()
                    .find(|(_, angle, orb)| (sep - angle).abs() <= *orb)
                {
                    aspects.push(AspectRecord::new(first.name, *kind, second.name, sep - angle));
                }
            }
        }

        Ok(ChartReport { header, aspects })
    }
}
