//! Shared harness for the engine tests: a recording radio, a manually
//! advanced clock and an upper layer collecting every event.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::mac::{MacEvent, MacService, UpperLayer};
use crate::phy::tests::{TestClock, TestRadio};

pub(crate) struct TestUpper {
    pub events: Rc<RefCell<Vec<MacEvent>>>,
}

impl UpperLayer for TestUpper {
    fn mac_event(&mut self, event: MacEvent) {
        self.events.borrow_mut().push(event);
    }
}

pub(crate) type TestMac = MacService<TestRadio, TestClock, TestUpper>;

/// Build a MAC service wired to test doubles.
pub(crate) fn service() -> (TestMac, TestRadio, TestClock, Rc<RefCell<Vec<MacEvent>>>) {
    let radio = TestRadio::default();
    let clock = TestClock::default();
    let events = Rc::new(RefCell::new(Vec::new()));
    let upper = TestUpper {
        events: events.clone(),
    };
    let mac = MacService::new(radio.clone(), clock.clone(), upper);
    (mac, radio, clock, events)
}

/// Run the task loop until it reports no more work.
pub(crate) fn drive(mac: &mut TestMac) {
    while mac.wpan_task() {}
}
