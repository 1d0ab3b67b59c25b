//! Emission engine
//!
//! After every committed transition the records are evaluated in
//! declaration order against the fixed `(old, new)` pair. Every record whose
//! predicate holds contributes its events, in emitter order. Evaluation
//! finishes before any event is dispatched, so listeners that commit again
//! start a fresh, independent transition.

use smallvec::{smallvec, SmallVec};
use tessera_core::{Event, EventChannel};

/// Transition predicate over `(old, new)`
pub type Predicate<S> = Box<dyn Fn(&S, &S) -> bool>;

/// Builds the events for one record from the new state
pub type Emitter<S> = Box<dyn Fn(&S) -> SmallVec<[Event; 1]>>;

/// Events produced by one evaluation pass, tagged with their channel
pub type Emissions = SmallVec<[(EventChannel, Event); 2]>;

/// A declarative rule mapping a transition predicate to synthesized events
pub struct EmitRecord<S> {
    when: Predicate<S>,
    emitters: SmallVec<[Emitter<S>; 1]>,
    channel: EventChannel,
}

impl<S: 'static> EmitRecord<S> {
    /// One event per firing, dispatched on the instance
    pub fn new<P, E>(when: P, emit: E) -> Self
    where
        P: Fn(&S, &S) -> bool + 'static,
        E: Fn(&S) -> Event + 'static,
    {
        Self {
            when: Box::new(when),
            emitters: smallvec![single(emit)],
            channel: EventChannel::Local,
        }
    }

    /// Any number of events per firing
    pub fn many<P, E>(when: P, emit: E) -> Self
    where
        P: Fn(&S, &S) -> bool + 'static,
        E: Fn(&S) -> Vec<Event> + 'static,
    {
        Self {
            when: Box::new(when),
            emitters: smallvec![batch(emit)],
            channel: EventChannel::Local,
        }
    }

    /// Append a further emitter that fires with the same predicate
    pub fn and_emit<E>(mut self, emit: E) -> Self
    where
        E: Fn(&S) -> Event + 'static,
    {
        self.emitters.push(single(emit));
        self
    }

    /// Dispatch through the process-wide source instead of the instance
    pub fn global(self) -> Self {
        self.on_channel(EventChannel::Global)
    }

    pub fn on_channel(mut self, channel: EventChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn channel(&self) -> EventChannel {
        self.channel
    }
}

fn single<S: 'static, E>(emit: E) -> Emitter<S>
where
    E: Fn(&S) -> Event + 'static,
{
    Box::new(move |state: &S| -> SmallVec<[Event; 1]> { smallvec![emit(state)] })
}

fn batch<S: 'static, E>(emit: E) -> Emitter<S>
where
    E: Fn(&S) -> Vec<Event> + 'static,
{
    Box::new(move |state: &S| -> SmallVec<[Event; 1]> { SmallVec::from_vec(emit(state)) })
}

/// Evaluate every record against one transition
pub fn evaluate<S>(records: &[EmitRecord<S>], old: &S, new: &S) -> Emissions {
    let mut out = Emissions::new();
    for record in records {
        if !(record.when)(old, new) {
            continue;
        }
        for emitter in &record.emitters {
            out.extend(emitter(new).into_iter().map(|event| (record.channel, event)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(emissions: &Emissions) -> Vec<&str> {
        emissions.iter().map(|(_, e)| e.name.as_str()).collect()
    }

    #[test]
    fn test_records_fire_in_declaration_order() {
        let records = vec![
            EmitRecord::new(|_: &i32, n: &i32| *n > 0, |_| Event::new("positive")),
            EmitRecord::new(|o: &i32, n: &i32| o != n, |_| Event::new("changed")),
            EmitRecord::new(|_: &i32, n: &i32| *n > 100, |_| Event::new("huge")),
        ];

        let out = evaluate(&records, &0, &5);
        assert_eq!(names(&out), vec!["positive", "changed"]);
    }

    #[test]
    fn test_emitter_list_keeps_order_and_sees_new_state() {
        let records = vec![EmitRecord::new(
            |_: &i32, _: &i32| true,
            |n: &i32| Event::new("first").with_detail(*n),
        )
        .and_emit(|n: &i32| Event::new("second").with_detail(*n))];

        let out = evaluate(&records, &1, &2);
        assert_eq!(names(&out), vec!["first", "second"]);
        assert!(out.iter().all(|(_, e)| e.detail::<i32>() == Some(&2)));
    }

    #[test]
    fn test_many_and_channel() {
        let records = vec![EmitRecord::many(
            |_: &u8, _: &u8| true,
            |_| vec![Event::new("a"), Event::new("b")],
        )
        .global()];

        let out = evaluate(&records, &0, &1);
        assert_eq!(names(&out), vec!["a", "b"]);
        assert!(out.iter().all(|(c, _)| *c == EventChannel::Global));
    }
}
