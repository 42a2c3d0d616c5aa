use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};

use crate::models::{Booking, PhoneNumber};

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, call_sid, patient_name, reason, date_time, date_of_birth,
                               phone_e164, phone_spoken, duration_minutes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.call_sid,
            booking.patient_name,
            booking.reason,
            booking.date_time.format(DT_FMT).to_string(),
            booking.date_of_birth.format(DATE_FMT).to_string(),
            booking.phone.e164,
            booking.phone.spoken,
            booking.duration_minutes,
            booking.created_at.format(DT_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, call_sid, patient_name, reason, date_time, date_of_birth,
                phone_e164, phone_spoken, duration_minutes, created_at
         FROM bookings WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_upcoming_bookings(
    conn: &Connection,
    after: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, call_sid, patient_name, reason, date_time, date_of_birth,
                phone_e164, phone_spoken, duration_minutes, created_at
         FROM bookings WHERE date_time >= ?1 ORDER BY date_time ASC",
    )?;

    let rows = stmt.query_map(params![after.format(DT_FMT).to_string()], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &Row<'_>) -> anyhow::Result<Booking> {
    let date_time: String = row.get(4)?;
    let date_of_birth: String = row.get(5)?;
    let created_at: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        patient_name: row.get(2)?,
        reason: row.get(3)?,
        date_time: NaiveDateTime::parse_from_str(&date_time, DT_FMT)?,
        date_of_birth: NaiveDate::parse_from_str(&date_of_birth, DATE_FMT)?,
        phone: PhoneNumber {
            e164: row.get(6)?,
            spoken: row.get(7)?,
        },
        duration_minutes: row.get(8)?,
        created_at: NaiveDateTime::parse_from_str(&created_at, DT_FMT)?,
    })
}
