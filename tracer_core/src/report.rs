//! Sweep results and their line-oriented rendering for the host.

use serde::Serialize;
use tracer_traits::LinkPort;

use crate::curve::IvPoint;
use crate::error::{LinkError, Result};
use crate::isc::{IscOutcome, OpenCircuit};
use crate::scale::ScaleFactors;
use crate::status::EndReason;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub open_circuit: OpenCircuit,
    pub isc: IscOutcome,
    pub scale: ScaleFactors,
    pub min_distance: u16,
    pub curve: Vec<IvPoint>,
    pub measurements: u32,
    pub end: EndReason,
    /// Duration of the acquisition loop only.
    pub elapsed_us: u64,
}

impl SweepReport {
    pub fn us_per_measurement(&self) -> f64 {
        if self.measurements == 0 {
            return 0.0;
        }
        self.elapsed_us as f64 / f64::from(self.measurements)
    }

    /// Host-facing output, one entry per line, without terminators.
    pub fn lines(&self) -> Vec<String> {
        let zero = self.open_circuit.zero_current;
        let mut out = Vec::with_capacity(self.curve.len() + 12);
        if !self.isc.stable {
            out.push(format!(
                "WARNING: Isc did not stabilize after {} polls",
                self.isc.polls
            ));
        }
        out.push(format!("Isc CH0:{zero} CH1:{}", self.isc.isc));
        out.extend(
            self.curve
                .iter()
                .enumerate()
                .map(|(idx, p)| format!("{idx} CH0:{} CH1:{}", p.voltage, p.current)),
        );
        out.push(format!("Voc CH0:{} CH1:{zero}", self.open_circuit.voc));
        out.push(format!("Isc poll loops: {}", self.isc.polls));
        out.push(format!("Number of measurements: {}", self.measurements));
        out.push(format!("Number of recorded points: {}", self.curve.len()));
        out.push(format!("i_scale: {}", self.scale.i_scale));
        out.push(format!("v_scale: {}", self.scale.v_scale));
        out.push(format!("Elapsed usecs: {}", self.elapsed_us));
        out.push(format!(
            "Time (usecs) per i/v reading: {:.2}",
            self.us_per_measurement()
        ));
        if !self.end.is_normal() {
            out.push("WARNING: measurement limit reached".to_string());
        }
        out.push("Output complete".to_string());
        out
    }

    pub fn write_to<L: LinkPort + ?Sized>(&self, link: &mut L) -> Result<()> {
        for line in self.lines() {
            link.write_line(&line)
                .map_err(|e| LinkError::Port(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SweepReport {
        SweepReport {
            open_circuit: OpenCircuit {
                voc: 3000,
                zero_current: 2,
            },
            isc: IscOutcome {
                isc: 1000,
                polls: 12,
                stable: true,
            },
            scale: ScaleFactors {
                v_scale: 3,
                i_scale: 6,
            },
            min_distance: 54,
            curve: vec![IvPoint::new(0, 1000), IvPoint::new(1500, 900)],
            measurements: 40,
            end: EndReason::Flattened,
            elapsed_us: 1000,
        }
    }

    #[test]
    fn line_layout() {
        let lines = report().lines();
        assert_eq!(
            lines,
            vec![
                "Isc CH0:2 CH1:1000",
                "0 CH0:0 CH1:1000",
                "1 CH0:1500 CH1:900",
                "Voc CH0:3000 CH1:2",
                "Isc poll loops: 12",
                "Number of measurements: 40",
                "Number of recorded points: 2",
                "i_scale: 6",
                "v_scale: 3",
                "Elapsed usecs: 1000",
                "Time (usecs) per i/v reading: 25.00",
                "Output complete",
            ]
        );
    }

    #[test]
    fn warnings_bracket_degraded_sweeps() {
        let mut r = report();
        r.isc.stable = false;
        r.end = EndReason::MeasurementLimit;
        let lines = r.lines();
        assert_eq!(lines[0], "WARNING: Isc did not stabilize after 12 polls");
        assert_eq!(lines[lines.len() - 2], "WARNING: measurement limit reached");
        assert_eq!(lines[lines.len() - 1], "Output complete");
    }

    #[test]
    fn zero_measurements_do_not_divide() {
        let mut r = report();
        r.measurements = 0;
        assert_eq!(r.us_per_measurement(), 0.0);
    }
}
