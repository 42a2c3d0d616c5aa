use chrono::Duration;

use crate::models::Booking;

/// Render a confirmed booking as an iCalendar event. The download link for
/// this goes into the confirmation SMS in place of a hosted calendar invite.
pub fn generate_ics(booking: &Booking, clinic_name: &str) -> String {
    let dtstart = booking.date_time.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (booking.date_time + Duration::minutes(booking.duration_minutes as i64))
        .format("%Y%m%dT%H%M%S")
        .to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@medvoice", booking.id);

    let summary = format!("{clinic_name}: {} / {}", booking.patient_name, booking.reason);
    let description = format!(
        "DOB: {}. Phone: {}.",
        booking.date_of_birth.format("%Y-%m-%d"),
        booking.phone.e164
    );

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//MedVoice//Intake Agent//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

/// One VCALENDAR covering all upcoming bookings, for clinic-side calendar
/// subscriptions.
pub fn generate_feed(bookings: &[Booking], clinic_name: &str) -> String {
    let mut out = String::from(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//MedVoice//Intake Agent//EN\r\n",
    );
    for booking in bookings {
        let dtstart = booking.date_time.format("%Y%m%dT%H%M%S");
        let dtend = (booking.date_time + Duration::minutes(booking.duration_minutes as i64))
            .format("%Y%m%dT%H%M%S");
        let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S");
        out.push_str(&format!(
            "BEGIN:VEVENT\r\n\
             UID:{}@medvoice\r\n\
             DTSTAMP:{dtstamp}\r\n\
             DTSTART:{dtstart}\r\n\
             DTEND:{dtend}\r\n\
             SUMMARY:{clinic_name}: {} / {}\r\n\
             END:VEVENT\r\n",
            booking.id, booking.patient_name, booking.reason
        ));
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Booking, PhoneNumber};
    use chrono::{NaiveDate, NaiveDateTime};

    fn booking() -> Booking {
        Booking {
            id: "test-123".to_string(),
            call_sid: "CA-1".to_string(),
            patient_name: "John Smith".to_string(),
            reason: "Cleaning".to_string(),
            date_time: NaiveDateTime::parse_from_str("2025-03-15 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 5, 15).unwrap(),
            phone: PhoneNumber {
                e164: "+17188441007".to_string(),
                spoken: "718 844 1007".to_string(),
            },
            duration_minutes: 60,
            created_at: NaiveDateTime::parse_from_str("2025-03-10 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking(), "MedVoice Clinic");
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("DTSTART:20250315T100000"));
        assert!(ics.contains("DTEND:20250315T110000"));
        assert!(ics.contains("SUMMARY:MedVoice Clinic: John Smith / Cleaning"));
        assert!(ics.contains("DESCRIPTION:DOB: 1980-05-15. Phone: +17188441007."));
        assert!(ics.contains("UID:test-123@medvoice"));
        assert!(ics.contains("END:VCALENDAR"));
    }

    #[test]
    fn test_generate_feed_wraps_all_events_once() {
        let feed = generate_feed(&[booking(), booking()], "MedVoice Clinic");
        assert_eq!(feed.matches("BEGIN:VCALENDAR").count(), 1);
        assert_eq!(feed.matches("BEGIN:VEVENT").count(), 2);
        assert!(feed.ends_with("END:VCALENDAR\r\n"));
    }
}
