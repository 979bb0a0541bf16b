//! services/api/src/commands/seed.rs
//!
//! Seeds the support resources listed on the resources and crisis pages.

use moodigo_core::domain::{NewResource, ResourceType, SeedOutcome};
use moodigo_core::ports::DatabaseService;
use std::io::Write;
use tracing::info;

use super::CommandError;

const fn crisis(
    title: &'static str,
    description: &'static str,
    phone_number: &'static str,
    url: &'static str,
) -> NewResource {
    NewResource {
        title,
        description,
        resource_type: ResourceType::Crisis,
        url,
        phone_number,
        is_crisis: true,
    }
}

const fn listing(
    resource_type: ResourceType,
    title: &'static str,
    description: &'static str,
    url: &'static str,
) -> NewResource {
    NewResource {
        title,
        description,
        resource_type,
        url,
        phone_number: "",
        is_crisis: false,
    }
}

/// Crisis lines first, then counseling, apps, and articles.
pub fn initial_resources() -> Vec<NewResource> {
    use ResourceType::{App, Article, Counseling};

    vec![
        crisis(
            "988 Suicide & Crisis Lifeline",
            "Free and confidential emotional support 24/7 for people in suicidal crisis or emotional distress. Available nationwide in the United States.",
            "988",
            "https://988lifeline.org/",
        ),
        crisis(
            "Crisis Text Line",
            "Free crisis counseling via text message. Trained volunteers provide support for anyone in crisis, connecting them with resources.",
            "741741",
            "https://www.crisistextline.org/",
        ),
        crisis(
            "SAMHSA National Helpline",
            "Free treatment referral and information service for individuals facing mental health and/or substance use disorders.",
            "1-800-662-4357",
            "https://www.samhsa.gov/find-help/national-helpline",
        ),
        crisis(
            "The Trevor Project",
            "Crisis intervention and suicide prevention services for LGBTQ+ young people under 25.",
            "1-866-488-7386",
            "https://www.thetrevorproject.org/",
        ),
        crisis(
            "National Domestic Violence Hotline",
            "24/7 confidential support for domestic violence survivors and their loved ones.",
            "1-800-799-7233",
            "https://www.thehotline.org/",
        ),
        // --- Counseling ---
        listing(
            Counseling,
            "Psychology Today",
            "Find therapists, psychiatrists, and mental health professionals in your area. Comprehensive directory with filters for insurance, specialties, and more.",
            "https://www.psychologytoday.com/us/therapists",
        ),
        listing(
            Counseling,
            "BetterHelp",
            "Online therapy platform with licensed, trained, and experienced therapists. Accessible from anywhere with internet connection.",
            "https://www.betterhelp.com/",
        ),
        listing(
            Counseling,
            "Talkspace",
            "Online therapy and counseling services with licensed therapists. Text, audio, and video sessions available.",
            "https://www.talkspace.com/",
        ),
        listing(
            Counseling,
            "NAMI (National Alliance on Mental Illness)",
            "Local NAMI chapters provide support groups, education programs, and advocacy. Find your local chapter for in-person resources.",
            "https://www.nami.org/",
        ),
        listing(
            Counseling,
            "Open Path Psychotherapy Collective",
            "Affordable therapy options with sessions ranging from $30-$60. Non-profit organization helping make therapy accessible.",
            "https://openpathcollective.org/",
        ),
        // --- Apps ---
        listing(
            App,
            "Headspace",
            "Meditation and mindfulness app with guided sessions for anxiety, stress, sleep, and focus. Beginner-friendly with progress tracking.",
            "https://www.headspace.com/",
        ),
        listing(
            App,
            "Calm",
            "Sleep stories, meditation, and relaxation techniques. Features nature sounds, breathing programs, and masterclasses on mindfulness.",
            "https://www.calm.com/",
        ),
        listing(
            App,
            "Sanvello",
            "Anxiety and depression support with mood tracking, guided journeys, and coping tools based on cognitive behavioral therapy.",
            "https://www.sanvello.com/",
        ),
        listing(
            App,
            "Youper",
            "AI-powered emotional health assistant that helps track moods and provides personalized conversations for better mental health.",
            "https://www.youper.ai/",
        ),
        listing(
            App,
            "Talklife",
            "Peer support network where people share experiences and support each other through difficult times. Moderated community.",
            "https://www.talklife.co/",
        ),
        listing(
            App,
            "MindShift",
            "Free app to help teens and young adults cope with anxiety. Based on cognitive behavioral therapy principles.",
            "https://www.anxietycanada.com/resources/mindshift-app/",
        ),
        listing(
            App,
            "PTSD Coach",
            "Evidence-based app for managing PTSD symptoms. Created by the US Department of Veterans Affairs.",
            "https://www.ptsd.va.gov/appvid/mobile/",
        ),
        // --- Articles ---
        listing(
            Article,
            "Mental Health America",
            "Comprehensive resources on mental health conditions, screening tools, and advocacy. Evidence-based information and support.",
            "https://www.mhanational.org/",
        ),
        listing(
            Article,
            "National Institute of Mental Health (NIMH)",
            "Research-based information on mental health disorders, treatments, and ongoing studies. Government resource with latest scientific findings.",
            "https://www.nimh.nih.gov/",
        ),
        listing(
            Article,
            "Mayo Clinic Mental Health",
            "Medical information on mental health conditions, symptoms, causes, and treatments from trusted healthcare professionals.",
            "https://www.mayoclinic.org/diseases-conditions/mental-illness/symptoms-causes/syc-20374968",
        ),
        listing(
            Article,
            "American Psychological Association (APA)",
            "Professional resources on psychology, mental health research, and evidence-based treatment approaches.",
            "https://www.apa.org/topics/mental-health",
        ),
        listing(
            Article,
            "Centre for Addiction and Mental Health (CAMH)",
            "Educational resources on mental health and addiction, including self-help tools and family support information.",
            "https://www.camh.ca/",
        ),
        listing(
            Article,
            "Mindfulness-Based Stress Reduction",
            "Learn about MBSR techniques for managing stress, anxiety, and depression. Includes guided exercises and research.",
            "https://www.mindfulnessmbbsr.com/",
        ),
    ]
}

/// Get-or-create by title; `force` rewrites rows that already exist.
pub async fn setup_initial_data<W: Write>(
    db: &dyn DatabaseService,
    force: bool,
    out: &mut W,
) -> Result<Vec<(String, SeedOutcome)>, CommandError> {
    writeln!(out, "Setting up initial data for Moodigo...")?;
    let resources = initial_resources();
    let outcomes = db.seed_resources(&resources, force).await?;

    for (resource, (title, outcome)) in resources.iter().zip(&outcomes) {
        let verb = match outcome {
            SeedOutcome::Created => "Created",
            SeedOutcome::Updated => "Updated",
            SeedOutcome::Unchanged => continue,
        };
        writeln!(
            out,
            "{} {} resource: {}",
            verb,
            resource.resource_type.as_str(),
            title
        )?;
    }

    let created = outcomes
        .iter()
        .filter(|(_, o)| *o == SeedOutcome::Created)
        .count();
    info!("Seeded resources: {} created of {}", created, outcomes.len());
    writeln!(out, "Successfully set up initial data!")?;
    Ok(outcomes)
}
