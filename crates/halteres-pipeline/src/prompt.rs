//! Prompt construction for one week's generation request.
//!
//! The backend is stateless per call, so everything a week needs travels in
//! its prompt: the program requirements, the week's date range, the full
//! accumulated history of earlier weeks, and the retrieval block. The
//! format rules here are load-bearing: the `[DATE: MM-DD-YYYY]` header they
//! mandate is the marker the completion verifier counts.

use std::fmt::Write as _;

use crate::request::ProgramRequest;
use crate::retrieval::RetrievalContext;
use crate::week::WeekDescriptor;

/// Builds the developer prompt for one week.
pub fn week_prompt(
    request: &ProgramRequest,
    week: &WeekDescriptor,
    history: &str,
    retrieval: &RetrievalContext,
) -> String {
    let schedule = &request.schedule;
    let client = &request.client;
    let mut prompt = format!(
        "You are a professional fitness coach creating detailed, personalized workout programs.\n\n\
         PROGRAM DETAILS:\n\
         - Duration: {duration} weeks\n\
         - Workouts per Week: {per_week} ({days})\n\
         - Session Duration: {minutes} minutes\n\n\
         CLIENT PROFILE:\n\
         - Gender: {gender}\n\
         - Height: {height} cm, Weight: {weight} kg\n\
         - 1RM Bench: {bench} kg, 1RM Squat: {squat} kg, 1RM Deadlift: {deadlift} kg\n",
        duration = schedule.duration_weeks,
        per_week = request.workouts_per_week(),
        days = schedule.training_days.join(", "),
        minutes = schedule.session_minutes,
        gender = client.gender,
        height = client.height_cm.unwrap_or_default(),
        weight = client.weight_kg.unwrap_or_default(),
        bench = client.bench_1rm.unwrap_or_default(),
        squat = client.squat_1rm.unwrap_or_default(),
        deadlift = client.deadlift_1rm.unwrap_or_default(),
    );
    if let Some(mile) = client.mile_time {
        let _ = writeln!(prompt, "- Mile Time: {mile} minutes");
    }

    let _ = write!(
        prompt,
        "\nINSTRUCTIONS:\n\
         1. Generate ONLY Week {week} of {total}. Current week dates: {start} to {end}.\n\
         2. Write one complete workout for each training day ({days}); no skipping or summarizing.\n\
         3. Provide the date, title, focus areas, detailed warmup, main workout with sets/reps/rest, and cooldown for each day.\n\
         4. Avoid phrases like 'continue the same workouts' or 'similar to previous workouts'. Write out every session completely.\n\
         5. Each workout must account for equipment availability, injuries, and skill levels.\n\
         6. Each week builds on the previous week's progress.\n\n\
         PROGRAM REQUIREMENTS:\n\
         1. Training Styles: {styles}\n\
         2. Focus Areas: {focus}\n\
         3. Program Instructions: {instructions}\n\
         4. Equipment Available: {equipment}\n\n\
         MEDICAL CONSIDERATIONS:\n\
         Injuries and Movement Restrictions: {restrictions}\n\n\
         FORMAT REQUIREMENTS:\n\
         1. Write out EVERY workout in complete detail.\n\
         2. Begin each day with a header of exactly this form:\n\
            [DATE: MM-DD-YYYY]\n\
            Workout Title:\n\
         3. For each exercise, specify sets, reps, rest periods, RX and scaled weights for male and female, form cues, and modifications for listed injuries.\n\
         4. NEVER use phrases like 'repeat previous workout' or 'alternate between'. Write each workout completely.\n",
        week = week.week,
        total = week.total_weeks,
        start = week.start,
        end = week.end,
        days = schedule.training_days.join(", "),
        styles = request.format.format.join(", "),
        focus = request.format.focus.join(", "),
        instructions = request.format.instructions.as_deref().unwrap_or("None provided"),
        equipment = request.gym.equipment,
        restrictions = request.format.restrictions.as_deref().unwrap_or("None reported"),
    );

    if !history.is_empty() {
        let _ = write!(
            prompt,
            "\nPREVIOUS WEEKS (already delivered; continue their progression, do not repeat them):\n{history}\n"
        );
    }

    let _ = write!(
        prompt,
        "\nSimilar Reference Workouts:\n{refs}\n\n\
         Create the workouts for Week {week} following all these requirements while carefully accounting for the listed injuries and movement restrictions.",
        refs = retrieval.to_prompt_block(),
        week = week.week,
    );

    prompt
}
