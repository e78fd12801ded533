//! The generic move algorithm.
//!
//! A transfer is planned entirely with simulated calls before anything is
//! committed:
//!
//! 1. Simulate extracting up to `min(rate_cap, predicate.quantity())` of a
//!    candidate kind from the source.
//! 2. Simulate inserting that into the destination to learn how much it
//!    accepts.
//! 3. Under `exact_amount`, a shortfall on either side moves nothing.
//! 4. Otherwise extract the accepted amount for real and insert it.
//!
//! Candidate kinds are tried in the order the source yields them until one
//! moves something.

use crate::ingredient::{EnergyComponent, IngredientComponent, MatchCondition, Quantity};
use crate::predicate::IngredientPredicate;
use crate::storage::IngredientStorage;
use log::{trace, warn};

/// Everything but quantity: extraction of exactly the candidate's kind.
const SAME_KIND: MatchCondition = MatchCondition {
    quantity: false,
    damage: true,
    tag: true,
};

/// Move up to `rate_cap` of one kind matching `predicate` from `source` into
/// `dest`. Returns what was moved, empty when nothing was.
pub fn move_single<C, D, S>(
    dest: &mut D,
    source: &mut S,
    predicate: &IngredientPredicate<C>,
    rate_cap: Quantity,
) -> C::Instance
where
    C: IngredientComponent,
    D: IngredientStorage<C> + ?Sized,
    S: IngredientStorage<C> + ?Sized,
{
    let requested = rate_cap.min(predicate.quantity());
    if requested == 0 || predicate.is_match_none() {
        return C::empty();
    }
    let exact = predicate.exact_amount();

    let candidates: Vec<C::Instance> =
        source.iter().filter(|c| predicate.matches_kind(c)).collect();
    let mut tried: Vec<C::Instance> = Vec::new();
    for candidate in candidates {
        if tried.iter().any(|t| C::stacks_with(t, &candidate)) {
            continue;
        }
        tried.push(candidate.clone());

        let wanted = C::with_quantity(&candidate, requested);
        let offered = source.extract_matching(&wanted, SAME_KIND, true);
        let offered_qty = C::quantity(&offered);
        if offered_qty == 0 {
            continue;
        }
        if exact && offered_qty < requested {
            trace!("source offers {offered_qty} of {requested} requested, skipping exact transfer");
            continue;
        }

        let refused = C::quantity(&dest.insert(offered, true));
        if refused > offered_qty {
            warn!("destination refused {refused} of a simulated insert of {offered_qty}");
            continue;
        }
        let accepted = offered_qty - refused;
        if accepted == 0 {
            continue;
        }
        if exact && accepted < requested {
            trace!(
                "destination accepts {accepted} of {requested} requested, skipping exact transfer"
            );
            continue;
        }

        let wanted = C::with_quantity(&candidate, accepted);
        let taken = source.extract_matching(&wanted, SAME_KIND, false);
        let rejected = dest.insert(taken.clone(), false);
        if C::is_empty(&rejected) {
            return taken;
        }
        warn!(
            "destination rejected {} on commit after accepting it in simulation",
            C::quantity(&rejected)
        );
        let lost = source.insert(rejected.clone(), false);
        if !C::is_empty(&lost) {
            warn!("source could not take back {} rejected units", C::quantity(&lost));
        }
        return C::with_quantity(&taken, C::quantity(&taken).saturating_sub(C::quantity(&rejected)));
    }
    C::empty()
}

/// Move up to `amount` energy from `source` into `dest`. With `exact`, moves
/// either `amount` or nothing.
pub fn move_energy<D, S>(dest: &mut D, source: &mut S, amount: Quantity, exact: bool) -> Quantity
where
    D: IngredientStorage<EnergyComponent> + ?Sized,
    S: IngredientStorage<EnergyComponent> + ?Sized,
{
    if amount == 0 {
        return 0;
    }
    move_single(dest, source, &IngredientPredicate::match_all(amount, exact), amount)
}
