//! Utility bills
//!
//! A bill holds one extensible group per billing period. Each period is
//! stored as its begin date plus a day count, so consecutive periods never
//! need to repeat a date.

use std::marker::PhantomData;

use bemkit_core::{ExtensibleGroup, Handle, IddObject, ModelObject, Workspace, WorkspaceError};
use chrono::{Datelike, Days, Months, NaiveDate};
use tracing::debug;

const BEGIN_MONTH: &str = "Billing Period Begin Month";
const BEGIN_DAY: &str = "Billing Period Begin Day of Month";
const BEGIN_YEAR: &str = "Billing Period Begin Year";
const NUMBER_OF_DAYS: &str = "Number of Days in Billing Period";
const CONSUMPTION: &str = "Consumption";
const PEAK_DEMAND: &str = "Peak Demand";
const TOTAL_COST: &str = "Total Cost";

/// Metered consumption and cost of one fuel, by billing period
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:UtilityBill")]
pub struct UtilityBill<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "Fuel Type")]
    fuel_type: PhantomData<String>,

    #[idd(field = "Meter Install Location", default)]
    meter_install_location: PhantomData<String>,

    #[idd(field = "Meter Specific Install Location")]
    meter_specific_install_location: PhantomData<Option<String>>,

    #[idd(field = "Meter End Use Category")]
    meter_end_use_category: PhantomData<Option<String>>,

    #[idd(field = "Meter Specific End Use")]
    meter_specific_end_use: PhantomData<Option<String>>,

    #[idd(field = "Consumption Unit")]
    consumption_unit: PhantomData<String>,

    #[idd(field = "Consumption Unit Conversion Factor", default)]
    consumption_unit_conversion_factor: PhantomData<f64>,

    #[idd(field = "Peak Demand Unit")]
    peak_demand_unit: PhantomData<Option<String>>,

    #[idd(field = "Timesteps in Peak Demand Window", default)]
    timesteps_in_peak_demand_window: PhantomData<i32>,
}

/// Unit bills of `fuel_type` are usually metered in
fn default_consumption_unit(fuel_type: &str) -> &'static str {
    match fuel_type {
        "Electricity" => "kWh",
        "Gas" => "therms",
        "Water" => "gal",
        _ => "kBtu",
    }
}

impl<'w> UtilityBill<'w> {
    /// Add a bill for `fuel_type`, metered in that fuel's usual unit
    pub fn new(ws: &'w Workspace, fuel_type: &str) -> Result<Self, WorkspaceError> {
        let bill = Self::insert(ws)?;
        let index = ws.field_index(Self::IDD_OBJECT_TYPE, Self::FUEL_TYPE_FIELD)?;
        if let Err(e) = ws.try_set_string(bill.handle, index, fuel_type) {
            bill.remove();
            return Err(e);
        }
        bill.set_consumption_unit(default_consumption_unit(&bill.fuel_type()));
        Ok(bill)
    }

    /// Billing periods in insertion order
    pub fn billing_periods(&self) -> Vec<BillingPeriod<'w>> {
        self.ws
            .extensible_groups(self.handle)
            .into_iter()
            .map(|group| BillingPeriod { bill: *self, group })
            .collect()
    }

    /// Append a period covering `start..=end`
    ///
    /// Returns `None` if the dates are reversed or the period starts before
    /// the previous one ends.
    pub fn add_billing_period(&self, start: NaiveDate, end: NaiveDate) -> Option<BillingPeriod<'w>> {
        if end < start {
            debug!("Billing period {} - {} ends before it starts", start, end);
            return None;
        }
        if let Some(last_end) = self.billing_periods().last().and_then(BillingPeriod::end_date) {
            if start <= last_end {
                debug!("Billing period starting {} overlaps one ending {}", start, last_end);
                return None;
            }
        }

        let days = (end - start).num_days() + 1;
        let values = [
            start.month().to_string(),
            start.day().to_string(),
            start.year().to_string(),
            days.to_string(),
            String::new(),
            String::new(),
            String::new(),
        ];
        let group = self.ws.push_extensible_group(self.handle, &values)?;
        Some(BillingPeriod { bill: *self, group })
    }

    /// Append a one-month period starting the day after the last one ends
    ///
    /// Returns `None` when there is no period to continue from.
    pub fn add_next_billing_period(&self) -> Option<BillingPeriod<'w>> {
        let start = self.billing_periods().last()?.end_date()?.succ_opt()?;
        let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
        self.add_billing_period(start, end)
    }

    pub fn remove_billing_period(&self, index: usize) -> bool {
        self.ws.erase_extensible_group(self.handle, index)
    }

    pub fn remove_all_billing_periods(&self) {
        self.ws.clear_extensible_groups(self.handle)
    }

    /// Total consumption over every period that reports one
    pub fn total_consumption(&self) -> f64 {
        self.billing_periods()
            .iter()
            .filter_map(BillingPeriod::consumption)
            .sum()
    }
}

/// One billing period of a [`UtilityBill`]
#[derive(Clone, Copy)]
pub struct BillingPeriod<'w> {
    bill: UtilityBill<'w>,
    group: ExtensibleGroup<'w>,
}

impl<'w> BillingPeriod<'w> {
    pub fn bill(&self) -> UtilityBill<'w> {
        self.bill
    }

    /// Position of this period within the bill
    pub fn index(&self) -> usize {
        self.group.group_index()
    }

    fn offset(&self, field: &str) -> usize {
        self.bill
            .ws
            .registry()
            .get_schema(UtilityBill::IDD_OBJECT_TYPE)
            .ok()
            .and_then(|schema| schema.group_offset(field))
            .expect("Billing period field missing from schema")
    }

    fn get_int(&self, field: &str) -> Option<i32> {
        self.group.get_int(self.offset(field))
    }

    fn get_double(&self, field: &str) -> Option<f64> {
        self.group.get_double(self.offset(field))
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        let year = self.get_int(BEGIN_YEAR)?;
        let month = u32::try_from(self.get_int(BEGIN_MONTH)?).ok()?;
        let day = u32::try_from(self.get_int(BEGIN_DAY)?).ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    pub fn number_of_days(&self) -> Option<i32> {
        self.get_int(NUMBER_OF_DAYS)
    }

    /// Last day of the period, inclusive
    pub fn end_date(&self) -> Option<NaiveDate> {
        let days = u64::try_from(self.number_of_days()?).ok()?;
        self.start_date()?.checked_add_days(Days::new(days.checked_sub(1)?))
    }

    /// End of the period before this one and start of the one after
    fn neighbours(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let periods = self.bill.billing_periods();
        let index = self.index();
        let previous_end = index
            .checked_sub(1)
            .and_then(|i| periods.get(i))
            .and_then(BillingPeriod::end_date);
        let next_start = periods.get(index + 1).and_then(BillingPeriod::start_date);
        (previous_end, next_start)
    }

    /// Whether `start..=end` is ordered and clear of the neighbouring periods
    fn fits(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if end < start {
            debug!("Billing period {} - {} ends before it starts", start, end);
            return false;
        }
        let (previous_end, next_start) = self.neighbours();
        if previous_end.is_some_and(|previous_end| start <= previous_end)
            || next_start.is_some_and(|next_start| end >= next_start)
        {
            debug!("Billing period {} - {} overlaps a neighbouring period", start, end);
            return false;
        }
        true
    }

    /// Store `start..=end`, putting the old fields back if any write is refused
    fn write_range(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let Ok(days) = i32::try_from((end - start).num_days() + 1) else {
            return false;
        };
        let writes = [
            (BEGIN_YEAR, start.year()),
            (BEGIN_MONTH, start.month() as i32),
            (BEGIN_DAY, start.day() as i32),
            (NUMBER_OF_DAYS, days),
        ];
        let saved: Vec<_> = writes
            .iter()
            .map(|(field, _)| {
                let offset = self.offset(field);
                (offset, (!self.group.is_empty(offset)).then(|| self.group.get_string(offset)).flatten())
            })
            .collect();

        for (field, value) in writes {
            if !self.group.set_int(self.offset(field), value) {
                for (offset, old) in &saved {
                    match old {
                        Some(old) => {
                            self.group.set_string(*offset, old);
                        }
                        None => self.group.reset(*offset),
                    }
                }
                return false;
            }
        }
        true
    }

    /// Move the start, keeping the number of days
    ///
    /// Returns `false` and leaves the period untouched if the moved period
    /// would overlap a neighbour.
    pub fn set_start_date(&self, start: NaiveDate) -> bool {
        let days = self.number_of_days().filter(|days| *days >= 1).unwrap_or(1);
        let Some(end) = start.checked_add_days(Days::new(days as u64 - 1)) else {
            return false;
        };
        self.fits(start, end) && self.write_range(start, end)
    }

    /// Move the end, keeping the start
    ///
    /// Returns `false` if the end would precede the start or run into the
    /// next period.
    pub fn set_end_date(&self, end: NaiveDate) -> bool {
        let Some(start) = self.start_date() else {
            return false;
        };
        self.fits(start, end) && self.write_range(start, end)
    }

    pub fn consumption(&self) -> Option<f64> {
        self.get_double(CONSUMPTION)
    }

    pub fn set_consumption(&self, value: f64) -> bool {
        self.group.set_double(self.offset(CONSUMPTION), value)
    }

    pub fn peak_demand(&self) -> Option<f64> {
        self.get_double(PEAK_DEMAND)
    }

    pub fn set_peak_demand(&self, value: f64) -> bool {
        self.group.set_double(self.offset(PEAK_DEMAND), value)
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.get_double(TOTAL_COST)
    }

    pub fn set_total_cost(&self, value: f64) -> bool {
        self.group.set_double(self.offset(TOTAL_COST), value)
    }
}

impl std::fmt::Debug for BillingPeriod<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingPeriod")
            .field("bill", &self.bill)
            .field("index", &self.index())
            .field("start_date", &self.start_date())
            .field("end_date", &self.end_date())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_new_bill() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "electricity").unwrap();
        assert_eq!(bill.fuel_type(), "Electricity");
        assert_eq!(bill.consumption_unit(), "kWh");
        assert_eq!(bill.meter_install_location(), "Facility");
        assert!(bill.billing_periods().is_empty());

        assert!(matches!(UtilityBill::new(&ws, "Moonlight"), Err(WorkspaceError::Field(_))));
        assert_eq!(UtilityBill::all(&ws).len(), 1);
    }

    #[test]
    fn test_consecutive_billing_periods() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "Gas").unwrap();

        bill.add_billing_period(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        bill.add_next_billing_period().unwrap();
        bill.add_next_billing_period().unwrap();

        let periods = bill.billing_periods();
        assert_eq!(periods.len(), 3);
        for pair in periods.windows(2) {
            let previous_end = pair[0].end_date().unwrap();
            assert_eq!(pair[1].start_date(), previous_end.succ_opt());
        }
        assert_eq!(periods[1].end_date(), Some(date(2024, 2, 29)));
        assert_eq!(periods[2].number_of_days(), Some(31));
    }

    #[test]
    fn test_rejects_overlapping_periods() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "Electricity").unwrap();

        assert!(bill.add_next_billing_period().is_none());
        assert!(bill.add_billing_period(date(2024, 3, 1), date(2024, 2, 1)).is_none());
        bill.add_billing_period(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert!(bill.add_billing_period(date(2024, 1, 31), date(2024, 2, 28)).is_none());
        assert_eq!(bill.billing_periods().len(), 1);
    }

    #[test]
    fn test_period_values() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "Electricity").unwrap();
        let period = bill.add_billing_period(date(2023, 12, 15), date(2024, 1, 14)).unwrap();

        assert_eq!(period.number_of_days(), Some(31));
        assert!(period.set_consumption(1200.0));
        assert!(!period.set_consumption(-1.0));
        assert!(period.set_total_cost(180.5));
        assert_eq!(period.consumption(), Some(1200.0));
        assert_eq!(period.peak_demand(), None);

        assert!(period.set_end_date(date(2024, 1, 20)));
        assert_eq!(period.number_of_days(), Some(37));
        assert!(!period.set_end_date(date(2023, 12, 1)));

        let next = bill.add_next_billing_period().unwrap();
        next.set_consumption(800.0);
        assert_eq!(bill.total_consumption(), 2000.0);

        assert!(bill.remove_billing_period(0));
        assert_eq!(bill.billing_periods()[0].start_date(), Some(date(2024, 1, 21)));
        bill.remove_all_billing_periods();
        assert!(bill.billing_periods().is_empty());
    }

    #[test]
    fn test_set_end_date_keeps_clear_of_next_period() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "Electricity").unwrap();
        let first = bill.add_billing_period(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        bill.add_billing_period(date(2024, 2, 1), date(2024, 2, 29)).unwrap();

        assert!(!first.set_end_date(date(2024, 2, 1)));
        assert!(!first.set_end_date(date(2024, 3, 15)));
        assert_eq!(first.end_date(), Some(date(2024, 1, 31)));

        assert!(first.set_end_date(date(2024, 1, 20)));
        assert_eq!(first.number_of_days(), Some(20));
    }

    #[test]
    fn test_set_start_date_keeps_clear_of_previous_period() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "Gas").unwrap();
        bill.add_billing_period(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let second = bill.add_billing_period(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        let third = bill.add_billing_period(date(2024, 3, 1), date(2024, 3, 31)).unwrap();

        assert!(!second.set_start_date(date(2024, 1, 31)));
        assert_eq!(second.start_date(), Some(date(2024, 2, 1)));
        assert_eq!(second.number_of_days(), Some(29));

        // 29 days from Feb 5 runs into March
        assert!(!second.set_start_date(date(2024, 2, 5)));
        assert_eq!(second.end_date(), Some(date(2024, 2, 29)));

        assert!(third.set_start_date(date(2024, 3, 2)));
        assert_eq!(third.end_date(), Some(date(2024, 4, 1)));
    }

    #[test]
    fn test_refused_start_date_changes_nothing() {
        let ws = crate::new_workspace().unwrap();
        let bill = UtilityBill::new(&ws, "Water").unwrap();
        let period = bill.add_billing_period(date(2024, 6, 1), date(2024, 6, 30)).unwrap();

        assert!(!period.set_start_date(date(1850, 6, 1)));
        assert_eq!(period.start_date(), Some(date(2024, 6, 1)));
        assert_eq!(period.number_of_days(), Some(30));
    }
}
