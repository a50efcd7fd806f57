//! Numeric processing for the Uravu flux pipeline.
//!
//! This crate turns an hourly weather series into absolute humidity, vapour
//! stock and transportable flux figures, and builds the coarse global
//! humidity grid.

pub mod flux;
pub mod global;

/// Absolute humidity from temperature and relative humidity.
///
/// Saturation vapour pressure uses the Tetens approximation
/// `Es = 6.112 · exp(17.67·T / (T + 243.5))` in hPa, and
/// `AH = Es · 100 · RH/100 · 2.1674 / (273.15 + T)` in g/m³.
pub mod humidity {
    /// Saturation vapour pressure in hPa at `temperature_c`.
    pub fn saturation_vapor_pressure_hpa(temperature_c: f64) -> f64 {
        6.112 * ((17.67 * temperature_c) / (temperature_c + 243.5)).exp()
    }

    /// Absolute humidity in g/m³.
    pub fn absolute_humidity(temperature_c: f64, relative_humidity_pct: f64) -> f64 {
        let es = saturation_vapor_pressure_hpa(temperature_c);
        (es * 100.0 * (relative_humidity_pct / 100.0) * 2.1674) / (273.15 + temperature_c)
    }

    const LANES: usize = 8;

    /// Which evaluation path computes a batch. Both produce the same values;
    /// the accelerated path works on fixed-width lanes the compiler can
    /// vectorise.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub enum Kernel {
        Reference,
        #[default]
        Accelerated,
    }

    impl Kernel {
        pub fn from_flag(accelerated: bool) -> Self {
            if accelerated {
                Kernel::Accelerated
            } else {
                Kernel::Reference
            }
        }

        /// Absolute humidity for paired samples. Extra elements of the longer
        /// slice are ignored.
        pub fn absolute_humidity(&self, temperature_c: &[f64], relative_humidity_pct: &[f64]) -> Vec<f64> {
            match self {
                Kernel::Reference => reference_kernel(temperature_c, relative_humidity_pct),
                Kernel::Accelerated => accelerated_kernel(temperature_c, relative_humidity_pct),
            }
        }
    }

    fn reference_kernel(t: &[f64], rh: &[f64]) -> Vec<f64> {
        t.iter()
            .zip(rh)
            .map(|(t, rh)| absolute_humidity(*t, *rh))
            .collect()
    }

    fn accelerated_kernel(t: &[f64], rh: &[f64]) -> Vec<f64> {
        let n = t.len().min(rh.len());
        let (t, rh) = (&t[..n], &rh[..n]);
        let mut out = vec![0.0; n];

        let mut out_chunks = out.chunks_exact_mut(LANES);
        let mut t_chunks = t.chunks_exact(LANES);
        let mut rh_chunks = rh.chunks_exact(LANES);
        for ((o, tc), rc) in (&mut out_chunks).zip(&mut t_chunks).zip(&mut rh_chunks) {
            let mut es = [0.0f64; LANES];
            for lane in 0..LANES {
                es[lane] = (17.67 * tc[lane]) / (tc[lane] + 243.5);
            }
            for e in es.iter_mut() {
                *e = 6.112 * e.exp();
            }
            for lane in 0..LANES {
                o[lane] = (es[lane] * 100.0 * (rc[lane] / 100.0) * 2.1674) / (273.15 + tc[lane]);
            }
        }

        let tail = out_chunks.into_remainder();
        for ((o, t), rh) in tail
            .iter_mut()
            .zip(t_chunks.remainder())
            .zip(rh_chunks.remainder())
        {
            *o = absolute_humidity(*t, *rh);
        }
        out
    }

}
